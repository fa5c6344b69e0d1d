pub mod asistencia;
pub mod cliente;
pub mod contrato;
pub mod empleado;
pub mod empresa;
pub mod factura;
pub mod pago;
pub mod producto;
pub mod proforma;
pub mod proveedor;
pub mod remuneracion;
pub mod reporte;
pub mod rol;
pub mod sesion;
pub mod usuario;
pub mod venta;
