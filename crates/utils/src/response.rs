use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Envelope returned by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApiResponse<T, E = T> {
    success: bool,
    data: Option<T>,
    error_data: Option<E>,
    message: Option<String>,
}

impl<T, E> ApiResponse<T, E> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error_data: None,
            message: None,
        }
    }

    /// Success carrying a user-facing confirmation ("Cliente creado correctamente").
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error_data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn error_with_data(data: E) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: Some(data),
            message: None,
        }
    }

    /// A well-formed answer that still reports failure, e.g. "no attendance in range".
    pub fn failure_with_data(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: Some(data),
            error_data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_serializes_message_without_data() {
        let resp: ApiResponse<()> = ApiResponse::error("Estado no válido");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Estado no válido");
        assert!(json["data"].is_null());
    }

    #[test]
    fn success_with_message_keeps_both() {
        let resp: ApiResponse<i64> = ApiResponse::success_with_message(7, "ok");
        assert!(resp.is_success());
        assert_eq!(resp.message(), Some("ok"));
        assert_eq!(resp.into_data(), Some(7));
    }
}
