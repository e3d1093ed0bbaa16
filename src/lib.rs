pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::*;
pub use error::*;
pub use models::*;
pub use services::*;
