//! Fixture rows for service tests.

use db::DBService;
use sqlx::SqlitePool;

pub async fn pool() -> SqlitePool {
    DBService::new_in_memory().await.unwrap().pool
}

/// Salesperson (rol 2); returns the user id.
pub async fn usuario(pool: &SqlitePool, correo: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO usuarios (nombres, apellidos, numero_documento, correo, clave, rol_id)
         VALUES ('Carla', 'Mendoza', $1, $1, 'x', 2) RETURNING id",
    )
    .bind(correo)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn cliente(pool: &SqlitePool, razon_social: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO clientes (documento, razon_social) VALUES ($1, $1) RETURNING id")
        .bind(razon_social)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn empresa(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO empresas (nombre, ruc, direccion) VALUES ('Acme Seguridad', '20100000001', 'Lima') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn producto(pool: &SqlitePool, codigo: &str, precio: f64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO productos (codigo, nombre, precio_unitario) VALUES ($1, $1, $2) RETURNING id",
    )
    .bind(codigo)
    .bind(precio)
    .fetch_one(pool)
    .await
    .unwrap()
}
