use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use local_deployment::LocalDeployment;
use secrecy::SecretString;
use serde_json::{Value, json};
use services::services::config::{AdminBootstrap, Config};
use tower::ServiceExt;

const ADMIN: &str = "admin@acme.pe";
const CLAVE: &str = "secreto1";

async fn app() -> Router {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        admin: Some(AdminBootstrap {
            correo: ADMIN.to_string(),
            clave: SecretString::from(CLAVE.to_string()),
        }),
        ..Config::default()
    };
    server::router(LocalDeployment::from_config(config).await.unwrap())
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Logs in as the bootstrap administrator and returns the `sid=...` cookie pair.
async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({ "correo": ADMIN, "clave": CLAVE }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app().await;

    let (status, body) = send(&app, get("/menu", "sid=not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Debe iniciar sesión para acceder a esta página"
    );

    let (status, body) = send(
        &app,
        json_request("POST", "/login", None, json!({ "correo": ADMIN, "clave": "otra-clave" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Correo o contraseña incorrectos.");

    let (status, _) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn session_survives_until_logout() {
    let app = app().await;
    let cookie = login(&app).await;

    let (status, body) = send(&app, get("/sesion", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["correo"], ADMIN);
    assert!(body["data"].get("clave").is_none());

    let (status, _) = send(&app, json_request("POST", "/logout", Some(&cookie), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/sesion", &cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_in_user_cannot_deactivate_themself_by_update() {
    let app = app().await;
    let cookie = login(&app).await;
    let (_, sesion) = send(&app, get("/sesion", &cookie)).await;
    let yo = &sesion["data"];

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/usuarios/{}", yo["id"]),
            Some(&cookie),
            json!({
                "nombres": yo["nombres"],
                "apellidos": yo["apellidos"],
                "numero_documento": yo["numero_documento"],
                "correo": yo["correo"],
                "rol_id": yo["rol_id"],
                "activo": false
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No puede desactivar su propio usuario");

    let (status, _) = send(&app, get("/sesion", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn client_validation_and_conflicts_use_status_codes() {
    let app = app().await;
    let cookie = login(&app).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/clientes", Some(&cookie), json!({ "documento": "", "razon_social": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/clientes",
            Some(&cookie),
            json!({ "documento": "20123456789", "razon_social": "Hotel Plaza", "telefono": "01-4445555" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cliente creado correctamente");
    assert_eq!(body["data"]["celular"], "01-4445555");

    let (status, body) = send(&app, get("/clientes?buscar=plaza", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, get("/clientes/999", &cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/menu", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["clientes_activos"], 1);
}

#[tokio::test]
async fn quote_to_invoice_flow_feeds_reports() {
    let app = app().await;
    let cookie = login(&app).await;

    let (_, cliente) = send(
        &app,
        json_request(
            "POST",
            "/clientes",
            Some(&cookie),
            json!({ "documento": "20123456789", "razon_social": "Hotel Plaza" }),
        ),
    )
    .await;
    let (_, producto) = send(
        &app,
        json_request(
            "POST",
            "/productos",
            Some(&cookie),
            json!({ "codigo": "CAM-01", "nombre": "Cámara IP", "precio_unitario": 100.0 }),
        ),
    )
    .await;
    let empresa_id: i64 = create_empresa(&app, &cookie).await;

    let (status, proforma) = send(
        &app,
        json_request(
            "POST",
            "/proformas",
            Some(&cookie),
            json!({
                "cliente_id": cliente["data"]["id"],
                "empresa_id": empresa_id,
                "detalles": [
                    { "producto_id": producto["data"]["id"], "cantidad": 2.0, "precio_unitario": 100.0 },
                    { "producto_id": producto["data"]["id"], "cantidad": 0.0, "precio_unitario": 100.0 }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proforma["data"]["total"], 236.0);
    assert_eq!(proforma["data"]["detalles"].as_array().unwrap().len(), 1);
    let proforma_id = proforma["data"]["id"].as_i64().unwrap();

    // Pending quotes cannot be invoiced
    let (status, _) = send(
        &app,
        json_request("POST", &format!("/facturas/desde-proforma/{proforma_id}"), Some(&cookie), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request("POST", &format!("/proformas/{proforma_id}/aprobar"), Some(&cookie), json!({ "estado": "ANULADA" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Estado no válido");

    let (status, _) = send(
        &app,
        json_request("POST", &format!("/proformas/{proforma_id}/aprobar"), Some(&cookie), json!({ "estado": "APROBADA" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, factura) = send(
        &app,
        json_request("POST", &format!("/facturas/desde-proforma/{proforma_id}"), Some(&cookie), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(factura["data"]["total"], 236.0);
    assert_eq!(factura["data"]["detalles"][0]["tipo_detalle"], "ORIGINAL");
    let factura_id = factura["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        json_request("POST", &format!("/facturas/desde-proforma/{proforma_id}"), Some(&cookie), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        json_request("PUT", &format!("/facturas/{factura_id}/estado"), Some(&cookie), json!({ "estado": "PAGADA" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estado"], "PAGADA");

    let (status, kpis) = send(&app, get("/reportes/kpis", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kpis["data"]["proformas"]["convertidas"], 1);
    assert_eq!(kpis["data"]["ventas"]["completadas"], 1);
    assert_eq!(kpis["data"]["tasa_conversion"], 100.0);

    let (status, impacto) = send(&app, get(&format!("/facturas/{factura_id}/puede-eliminar"), &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(impacto["data"]["ventas"], 1);

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/facturas/{factura_id}"))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, proforma) = send(&app, get(&format!("/proformas/{proforma_id}"), &cookie)).await;
    assert_eq!(proforma["data"]["estado"], "APROBADA");
}

/// Creates a company through the multipart endpoint, logo included, and returns its id.
async fn create_empresa(app: &Router, cookie: &str) -> i64 {
    let boundary = "----backoffice-test";
    let logo: &[u8] = b"\x89PNG\r\n\x1a\nfake";
    let mut body = Vec::new();
    for (name, value) in [("nombre", "Acme SAC"), ("ruc", "20100000001"), ("direccion", "Av. Lima 123")] {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"logo\"; filename=\"logo.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(logo);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/empresa")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap();
    let (status, empresa) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empresa["data"]["tiene_logo"], true);
    let id = empresa["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/empresa/logo/{id}"), cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], logo);
    id
}
