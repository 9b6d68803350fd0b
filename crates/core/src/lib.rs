pub mod config;
pub mod error;
pub mod types;
pub mod week;

pub use config::AppConfig;
pub use error::{SiscocaError, SiscocaResult};
