//! Clients, products, suppliers and the company profile.

use db::models::{
    cliente::{Cliente, CreateCliente},
    empresa::{CreateEmpresa, Empresa, EmpresaLogo, Logo, UpdateEmpresa},
    producto::{CreateProducto, Producto, ProductoResumen},
    proveedor::{CreateProveedor, Proveedor},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use utils::validation::{is_blank, is_valid_email, non_blank};

pub const LOGO_MAX_BYTES: usize = 2 * 1024 * 1024;
pub const LOGO_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

/// Foreign-key failures become a conflict carrying `message`.
fn referenced(err: sqlx::Error, message: &str) -> CatalogError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            CatalogError::Conflict(message.to_string())
        }
        _ => CatalogError::Database(err),
    }
}

fn required(fields: &[(&str, &str)]) -> Result<(), CatalogError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((label, _)) => Err(CatalogError::Validation(format!(
            "El campo {label} es requerido"
        ))),
        None => Ok(()),
    }
}

fn check_email(email: Option<&str>) -> Result<(), CatalogError> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) if !is_valid_email(email) => Err(CatalogError::Validation(
            "El formato del correo no es válido".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn check_logo(logo: &Logo) -> Result<(), CatalogError> {
    if !LOGO_MIME_TYPES.contains(&logo.mime.as_str()) {
        return Err(CatalogError::Validation(
            "Solo se permiten imágenes JPEG, PNG o GIF".to_string(),
        ));
    }
    if logo.bytes.len() > LOGO_MAX_BYTES {
        return Err(CatalogError::Validation(
            "El logo no debe superar los 2 MB".to_string(),
        ));
    }
    Ok(())
}

fn normalize_cliente(data: &CreateCliente) -> Result<CreateCliente, CatalogError> {
    required(&[
        ("documento", data.documento.as_str()),
        ("razon_social", data.razon_social.as_str()),
    ])?;
    check_email(data.email.as_deref())?;
    let telefono = non_blank(data.telefono.clone());
    Ok(CreateCliente {
        documento: data.documento.trim().to_string(),
        razon_social: data.razon_social.trim().to_string(),
        direccion: non_blank(data.direccion.clone()),
        celular: non_blank(data.celular.clone()).or_else(|| telefono.clone()),
        telefono,
        email: non_blank(data.email.clone()),
        contacto: non_blank(data.contacto.clone()),
    })
}

pub struct CatalogService {
    pool: SqlitePool,
}

impl CatalogService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Clients

    pub async fn search_clientes(&self, buscar: Option<&str>) -> Result<Vec<Cliente>, CatalogError> {
        Ok(Cliente::search(&self.pool, buscar.unwrap_or_default()).await?)
    }

    pub async fn get_cliente(&self, id: i64) -> Result<Cliente, CatalogError> {
        Cliente::find_by_id(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound("Cliente no encontrado"))
    }

    pub async fn create_cliente(&self, data: &CreateCliente) -> Result<Cliente, CatalogError> {
        let data = normalize_cliente(data)?;
        let cliente = Cliente::create(&self.pool, &data).await?;
        info!(cliente_id = cliente.id, "Client created");
        Ok(cliente)
    }

    pub async fn update_cliente(&self, id: i64, data: &CreateCliente) -> Result<Cliente, CatalogError> {
        let data = normalize_cliente(data)?;
        Cliente::update(&self.pool, id, &data)
            .await?
            .ok_or(CatalogError::NotFound("Cliente no encontrado"))
    }

    pub async fn deactivate_cliente(&self, id: i64) -> Result<(), CatalogError> {
        if Cliente::deactivate(&self.pool, id).await? == 0 {
            return Err(CatalogError::NotFound("Cliente no encontrado"));
        }
        Ok(())
    }

    // Products

    pub async fn search_productos(
        &self,
        buscar: Option<&str>,
        codigo: Option<&str>,
    ) -> Result<Vec<Producto>, CatalogError> {
        let buscar = buscar.filter(|b| !b.trim().is_empty());
        let codigo = codigo.map(str::trim).filter(|c| !c.is_empty());
        Ok(Producto::search(&self.pool, buscar, codigo).await?)
    }

    pub async fn list_productos_compact(&self) -> Result<Vec<ProductoResumen>, CatalogError> {
        Ok(Producto::list_compact(&self.pool).await?)
    }

    pub async fn get_producto(&self, id: i64) -> Result<Producto, CatalogError> {
        Producto::find_by_id(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound("Producto no encontrado"))
    }

    async fn check_producto(&self, data: &CreateProducto, exclude_id: Option<i64>) -> Result<(), CatalogError> {
        required(&[
            ("codigo", data.codigo.as_str()),
            ("nombre", data.nombre.as_str()),
        ])?;
        if data.precio_unitario.is_some_and(|p| p < 0.0) {
            return Err(CatalogError::Validation(
                "El precio unitario no puede ser negativo".to_string(),
            ));
        }
        if Producto::exists_codigo(&self.pool, data.codigo.trim(), exclude_id).await? {
            return Err(CatalogError::Conflict("El código de producto ya existe".to_string()));
        }
        Ok(())
    }

    pub async fn create_producto(&self, data: &CreateProducto) -> Result<Producto, CatalogError> {
        self.check_producto(data, None).await?;
        let producto = Producto::create(&self.pool, data).await?;
        info!(producto_id = producto.id, codigo = %producto.codigo, "Product created");
        Ok(producto)
    }

    pub async fn update_producto(&self, id: i64, data: &CreateProducto) -> Result<Producto, CatalogError> {
        self.check_producto(data, Some(id)).await?;
        Producto::update(&self.pool, id, data)
            .await?
            .ok_or(CatalogError::NotFound("Producto no encontrado"))
    }

    pub async fn deactivate_producto(&self, id: i64) -> Result<(), CatalogError> {
        if Producto::deactivate(&self.pool, id).await? == 0 {
            return Err(CatalogError::NotFound("Producto no encontrado"));
        }
        Ok(())
    }

    // Suppliers

    pub async fn list_proveedores(&self) -> Result<Vec<Proveedor>, CatalogError> {
        Ok(Proveedor::find_all(&self.pool).await?)
    }

    pub async fn get_proveedor(&self, id: i64) -> Result<Proveedor, CatalogError> {
        Proveedor::find_by_id(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound("Proveedor no encontrado"))
    }

    async fn check_proveedor(&self, data: &CreateProveedor, exclude_id: Option<i64>) -> Result<(), CatalogError> {
        required(&[
            ("ruc", data.ruc.as_str()),
            ("razon_social", data.razon_social.as_str()),
        ])?;
        check_email(data.email.as_deref())?;
        if Proveedor::exists_ruc(&self.pool, data.ruc.trim(), exclude_id).await? {
            return Err(CatalogError::Conflict("Ya existe un proveedor con ese RUC".to_string()));
        }
        Ok(())
    }

    pub async fn create_proveedor(&self, data: &CreateProveedor) -> Result<Proveedor, CatalogError> {
        self.check_proveedor(data, None).await?;
        Ok(Proveedor::create(&self.pool, data).await?)
    }

    pub async fn update_proveedor(&self, id: i64, data: &CreateProveedor) -> Result<Proveedor, CatalogError> {
        self.check_proveedor(data, Some(id)).await?;
        Proveedor::update(&self.pool, id, data)
            .await?
            .ok_or(CatalogError::NotFound("Proveedor no encontrado"))
    }

    pub async fn set_proveedor_estado(&self, id: i64, estado: i64) -> Result<(), CatalogError> {
        let activo = match estado {
            0 => false,
            1 => true,
            _ => return Err(CatalogError::Validation("Estado no válido".to_string())),
        };
        if Proveedor::set_activo(&self.pool, id, activo).await? == 0 {
            return Err(CatalogError::NotFound("Proveedor no encontrado"));
        }
        Ok(())
    }

    pub async fn delete_proveedor(&self, id: i64) -> Result<(), CatalogError> {
        let deleted = Proveedor::delete(&self.pool, id).await.map_err(|e| {
            referenced(e, "No se puede eliminar el proveedor porque tiene registros asociados")
        })?;
        if deleted == 0 {
            return Err(CatalogError::NotFound("Proveedor no encontrado"));
        }
        Ok(())
    }

    // Company profile

    pub async fn list_empresas(&self) -> Result<Vec<Empresa>, CatalogError> {
        Ok(Empresa::find_all(&self.pool).await?)
    }

    pub async fn get_empresa(&self, id: i64) -> Result<Empresa, CatalogError> {
        Empresa::find_by_id(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound("Empresa no encontrada"))
    }

    pub async fn empresa_logo(&self, id: i64) -> Result<EmpresaLogo, CatalogError> {
        Empresa::find_logo(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound("Logo no encontrado"))
    }

    pub async fn create_empresa(
        &self,
        data: &CreateEmpresa,
        logo: Option<&Logo>,
    ) -> Result<Empresa, CatalogError> {
        required(&[
            ("nombre", data.nombre.as_str()),
            ("ruc", data.ruc.as_str()),
            ("direccion", data.direccion.as_str()),
        ])?;
        check_email(data.email.as_deref())?;
        if let Some(logo) = logo {
            check_logo(logo)?;
        }
        let empresa = Empresa::create(&self.pool, data, logo).await?;
        info!(empresa_id = empresa.id, "Company created");
        Ok(empresa)
    }

    pub async fn update_empresa(
        &self,
        id: i64,
        data: &UpdateEmpresa,
        logo: Option<&Logo>,
    ) -> Result<Empresa, CatalogError> {
        if data.is_empty() && logo.is_none() {
            return Err(CatalogError::Validation("No hay datos para actualizar".to_string()));
        }
        for (label, value) in [
            ("nombre", &data.nombre),
            ("ruc", &data.ruc),
            ("direccion", &data.direccion),
        ] {
            if value.is_some() && is_blank(value.as_deref()) {
                return Err(CatalogError::Validation(format!(
                    "El campo {label} no puede estar vacío"
                )));
            }
        }
        check_email(data.email.as_deref())?;
        if let Some(logo) = logo {
            check_logo(logo)?;
        }
        Empresa::update(&self.pool, id, data, logo)
            .await?
            .ok_or(CatalogError::NotFound("Empresa no encontrada"))
    }

    pub async fn delete_empresa(&self, id: i64) -> Result<(), CatalogError> {
        let deleted = Empresa::delete(&self.pool, id).await.map_err(|e| {
            warn!(empresa_id = id, error = %e, "Company delete failed");
            referenced(
                e,
                "No se puede eliminar la empresa porque tiene proformas o facturas asociadas",
            )
        })?;
        if deleted == 0 {
            return Err(CatalogError::NotFound("Empresa no encontrada"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    async fn service() -> CatalogService {
        CatalogService::new(DBService::new_in_memory().await.unwrap().pool)
    }

    fn empresa() -> CreateEmpresa {
        CreateEmpresa {
            nombre: "Acme".into(),
            ruc: "20100000001".into(),
            direccion: "Av. Arequipa 100".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cliente_celular_falls_back_to_telefono() {
        let catalog = service().await;
        let cliente = catalog
            .create_cliente(&CreateCliente {
                documento: " 20555111222 ".into(),
                razon_social: "Constructora Andina".into(),
                telefono: Some("014445555".into()),
                celular: Some("".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cliente.documento, "20555111222");
        assert_eq!(cliente.celular.as_deref(), Some("014445555"));

        let invalid = CreateCliente {
            documento: "1".into(),
            razon_social: "X".into(),
            email: Some("no-es-correo".into()),
            ..Default::default()
        };
        assert!(matches!(
            catalog.create_cliente(&invalid).await,
            Err(CatalogError::Validation(_))
        ));

        catalog.deactivate_cliente(cliente.id).await.unwrap();
        assert!(catalog.search_clientes(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_product_code_is_a_conflict() {
        let catalog = service().await;
        let data = CreateProducto {
            codigo: "CAM-01".into(),
            nombre: "Cámara IP".into(),
            precio_unitario: Some(150.0),
            ..Default::default()
        };
        let producto = catalog.create_producto(&data).await.unwrap();
        assert_eq!(producto.unidad_medida, "UNID");

        match catalog.create_producto(&data).await {
            Err(CatalogError::Conflict(msg)) => assert_eq!(msg, "El código de producto ya existe"),
            other => panic!("expected conflict, got {other:?}"),
        }
        // Updating itself keeps the code
        catalog.update_producto(producto.id, &data).await.unwrap();

        let found = catalog.search_productos(None, Some("CAM-01")).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn proveedor_ruc_unique_and_estado_toggle() {
        let catalog = service().await;
        let data = CreateProveedor {
            ruc: "20600000001".into(),
            razon_social: "Distribuidora Sur".into(),
            ..Default::default()
        };
        let proveedor = catalog.create_proveedor(&data).await.unwrap();
        assert!(matches!(
            catalog.create_proveedor(&data).await,
            Err(CatalogError::Conflict(_))
        ));
        catalog.set_proveedor_estado(proveedor.id, 0).await.unwrap();
        assert!(!catalog.get_proveedor(proveedor.id).await.unwrap().activo);
        assert!(matches!(
            catalog.set_proveedor_estado(proveedor.id, 7).await,
            Err(CatalogError::Validation(_))
        ));
        catalog.delete_proveedor(proveedor.id).await.unwrap();
        assert!(matches!(
            catalog.delete_proveedor(proveedor.id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empresa_update_rules_and_logo_limits() {
        let catalog = service().await;
        let empresa = catalog.create_empresa(&empresa(), None).await.unwrap();
        assert!(!empresa.tiene_logo);

        assert!(matches!(
            catalog.update_empresa(empresa.id, &UpdateEmpresa::default(), None).await,
            Err(CatalogError::Validation(msg)) if msg == "No hay datos para actualizar"
        ));
        let blank = UpdateEmpresa {
            ruc: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update_empresa(empresa.id, &blank, None).await,
            Err(CatalogError::Validation(_))
        ));

        let pdf = Logo {
            bytes: vec![1, 2, 3],
            mime: "application/pdf".into(),
        };
        assert!(check_logo(&pdf).is_err());
        let huge = Logo {
            bytes: vec![0; LOGO_MAX_BYTES + 1],
            mime: "image/png".into(),
        };
        assert!(check_logo(&huge).is_err());

        let png = Logo {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime: "image/png".into(),
        };
        let updated = catalog
            .update_empresa(empresa.id, &UpdateEmpresa::default(), Some(&png))
            .await
            .unwrap();
        assert!(updated.tiene_logo);
        assert_eq!(catalog.empresa_logo(empresa.id).await.unwrap().logo_tipo, "image/png");
    }
}
