pub mod log;
pub mod money;
pub mod response;
pub mod validation;
