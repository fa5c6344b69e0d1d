//! Company profile. Create and update take multipart forms so the logo can travel with
//! the text fields.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson},
    routing::get,
};
use db::models::empresa::{CreateEmpresa, Empresa, Logo, UpdateEmpresa};
use deployment::Deployment;
use services::services::catalog::LOGO_MAX_BYTES;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// Room for the largest accepted logo plus the text fields. Larger logos still reach the
/// service and get its friendly 400 instead of a bare 413.
const BODY_LIMIT: usize = 2 * LOGO_MAX_BYTES;

#[derive(Debug, Default)]
struct EmpresaForm {
    campos: HashMap<String, String>,
    logo: Option<Logo>,
}

impl EmpresaForm {
    fn take(&mut self, name: &str) -> Option<String> {
        self.campos.remove(name)
    }

    fn into_create(mut self) -> (CreateEmpresa, Option<Logo>) {
        let data = CreateEmpresa {
            nombre: self.take("nombre").unwrap_or_default(),
            ruc: self.take("ruc").unwrap_or_default(),
            direccion: self.take("direccion").unwrap_or_default(),
            telefono: self.take("telefono"),
            celular: self.take("celular"),
            email: self.take("email"),
            texto_presentacion: self.take("texto_presentacion"),
            cuenta_bancaria: self.take("cuenta_bancaria"),
            nombre_cuenta_bancaria: self.take("nombre_cuenta_bancaria"),
        };
        (data, self.logo)
    }

    fn into_update(mut self) -> (UpdateEmpresa, Option<Logo>) {
        let activo = self
            .take("activo")
            .map(|v| matches!(v.trim(), "1" | "true" | "on"));
        let data = UpdateEmpresa {
            nombre: self.take("nombre"),
            ruc: self.take("ruc"),
            direccion: self.take("direccion"),
            telefono: self.take("telefono"),
            celular: self.take("celular"),
            email: self.take("email"),
            texto_presentacion: self.take("texto_presentacion"),
            cuenta_bancaria: self.take("cuenta_bancaria"),
            nombre_cuenta_bancaria: self.take("nombre_cuenta_bancaria"),
            activo,
        };
        (data, self.logo)
    }
}

async fn read_form(mut multipart: Multipart) -> Result<EmpresaForm, ApiError> {
    let mut form = EmpresaForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "logo" {
            let mime = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            // An empty file input means "keep the current logo"
            if !bytes.is_empty() {
                form.logo = Some(Logo {
                    bytes: bytes.to_vec(),
                    mime,
                });
            }
        } else {
            let value = field.text().await?;
            form.campos.insert(name, value);
        }
    }
    Ok(form)
}

pub async fn list_empresas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Empresa>>>, ApiError> {
    let empresas = deployment.catalog().list_empresas().await?;
    Ok(ResponseJson(ApiResponse::success(empresas)))
}

pub async fn get_empresa(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Empresa>>, ApiError> {
    let empresa = deployment.catalog().get_empresa(id).await?;
    Ok(ResponseJson(ApiResponse::success(empresa)))
}

/// Raw logo bytes with their stored content type.
pub async fn get_logo(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let logo = deployment.catalog().empresa_logo(id).await?;
    Ok(([(header::CONTENT_TYPE, logo.logo_tipo)], logo.logo))
}

pub async fn create_empresa(
    State(deployment): State<DeploymentImpl>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Empresa>>, ApiError> {
    let (data, logo) = read_form(multipart).await?.into_create();
    let empresa = deployment
        .catalog()
        .create_empresa(&data, logo.as_ref())
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        empresa,
        "Empresa registrada correctamente",
    )))
}

pub async fn update_empresa(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Empresa>>, ApiError> {
    let (data, logo) = read_form(multipart).await?.into_update();
    let empresa = deployment
        .catalog()
        .update_empresa(id, &data, logo.as_ref())
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        empresa,
        "Empresa actualizada correctamente",
    )))
}

pub async fn delete_empresa(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.catalog().delete_empresa(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Empresa eliminada correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/empresa",
        Router::new()
            .route("/", get(list_empresas).post(create_empresa))
            .route("/logo/{id}", get(get_logo))
            .route(
                "/{id}",
                get(get_empresa).put(update_empresa).delete(delete_empresa),
            )
            .layer(DefaultBodyLimit::max(BODY_LIMIT)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_form_only_sets_sent_fields() {
        let mut form = EmpresaForm::default();
        form.campos.insert("telefono".into(), "01-555".into());
        form.campos.insert("activo".into(), "0".into());
        let (data, logo) = form.into_update();
        assert_eq!(data.telefono.as_deref(), Some("01-555"));
        assert_eq!(data.activo, Some(false));
        assert!(data.nombre.is_none());
        assert!(logo.is_none());
    }
}
