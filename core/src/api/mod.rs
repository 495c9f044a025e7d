pub mod configuration;
pub mod server;
pub mod types;
mod v1;
