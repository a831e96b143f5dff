//! Domain layer: value types shared by the services.

pub mod constants;
pub mod crypto;
pub mod types;
