pub mod attendance;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod contracts;
pub mod database_validator;
pub mod invoicing;
pub mod payroll;
pub mod proforma_expiry;
pub mod proformas;
pub mod reports;
pub mod sales;
pub mod staff;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;
