use std::{fs, path::Path};

use ts_rs::TS;

fn main() -> std::io::Result<()> {
    let decls = [
        utils::response::ApiResponse::<(), ()>::decl(),
        db::models::rol::Rol::decl(),
        db::models::rol::CreateRol::decl(),
        db::models::usuario::Usuario::decl(),
        db::models::usuario::CreateUsuario::decl(),
        db::models::usuario::UpdateUsuario::decl(),
        db::models::cliente::Cliente::decl(),
        db::models::cliente::CreateCliente::decl(),
        db::models::producto::Producto::decl(),
        db::models::producto::ProductoResumen::decl(),
        db::models::producto::CreateProducto::decl(),
        db::models::proveedor::Proveedor::decl(),
        db::models::proveedor::CreateProveedor::decl(),
        db::models::empresa::Empresa::decl(),
        db::models::empresa::CreateEmpresa::decl(),
        db::models::empresa::UpdateEmpresa::decl(),
        db::models::empleado::EstadoEmpleado::decl(),
        db::models::empleado::Empleado::decl(),
        db::models::empleado::CreateEmpleado::decl(),
        db::models::asistencia::EstadoAsistencia::decl(),
        db::models::asistencia::TipoAsistencia::decl(),
        db::models::asistencia::JornadaLaboral::decl(),
        db::models::asistencia::Asistencia::decl(),
        db::models::asistencia::CreateAsistencia::decl(),
        db::models::asistencia::ResumenHoras::decl(),
        db::models::asistencia::ResumenSemanal::decl(),
        db::models::pago::EstadoPago::decl(),
        db::models::pago::MetodoPago::decl(),
        db::models::pago::Pago::decl(),
        db::models::pago::CreatePago::decl(),
        db::models::remuneracion::Remuneracion::decl(),
        db::models::remuneracion::CreateRemuneracion::decl(),
        db::models::proforma::EstadoProforma::decl(),
        db::models::proforma::Proforma::decl(),
        db::models::proforma::ProformaDetalle::decl(),
        db::models::proforma::ProformaConDetalles::decl(),
        db::models::proforma::CreateProforma::decl(),
        db::models::proforma::CreateProformaDetalle::decl(),
        db::models::factura::EstadoFactura::decl(),
        db::models::factura::TipoDetalle::decl(),
        db::models::factura::Factura::decl(),
        db::models::factura::FacturaDetalle::decl(),
        db::models::factura::FacturaConDetalles::decl(),
        db::models::factura::CreateFactura::decl(),
        db::models::factura::CreateFacturaDetalle::decl(),
        db::models::factura::FacturaDesdeProforma::decl(),
        db::models::factura::ModificarDetalle::decl(),
        db::models::factura::UpdateFactura::decl(),
        db::models::factura::AgregarProducto::decl(),
        db::models::factura::CambiarEstadoFactura::decl(),
        db::models::factura::EstadisticasFacturas::decl(),
        db::models::venta::Venta::decl(),
        db::models::contrato::EstadoContrato::decl(),
        db::models::contrato::Contrato::decl(),
        db::models::contrato::CreateContrato::decl(),
        db::models::contrato::EstadisticasContratos::decl(),
        db::models::reporte::ProformasPorMes::decl(),
        db::models::reporte::ProformasPorEstado::decl(),
        db::models::reporte::TopCliente::decl(),
        db::models::reporte::ProformasPorCliente::decl(),
        db::models::reporte::VentasPorMes::decl(),
        db::models::reporte::TopClienteVentas::decl(),
        db::models::reporte::KpisProformas::decl(),
        db::models::reporte::KpisVentas::decl(),
        db::models::reporte::Kpis::decl(),
        db::models::reporte::VentasCliente::decl(),
        db::models::reporte::DiagnosticoVentas::decl(),
        db::models::reporte::ProformaVencida::decl(),
        services::services::auth::RecoveryToken::decl(),
        services::services::attendance::RangoEmpleado::decl(),
        services::services::attendance::EstadoRegistro::decl(),
        services::services::attendance::ResultadoRegistro::decl(),
        services::services::attendance::RegistroMultiple::decl(),
        services::services::payroll::CalcularPago::decl(),
        services::services::payroll::CalculoPago::decl(),
        services::services::payroll::HorasReales::decl(),
        services::services::payroll::Periodo::decl(),
        services::services::payroll::ResumenAsistencias::decl(),
        services::services::payroll::DesgloseDia::decl(),
        services::services::payroll::EstadisticasHoras::decl(),
        services::services::payroll::CalculoHoras::decl(),
        services::services::invoicing::PuedeEliminar::decl(),
        services::services::reports::EstadisticasMenu::decl(),
        server::routes::CambioEstado::decl(),
        server::routes::auth::LoginRequest::decl(),
        server::routes::auth::RecuperarRequest::decl(),
        server::routes::auth::NuevaClaveRequest::decl(),
    ];

    let mut out = String::from(
        "// This file was generated by `cargo run --bin generate_types`. Do not edit manually.\n\n",
    );
    for decl in decls {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&path, out)?;
    println!("Wrote {}", path.display());
    Ok(())
}
