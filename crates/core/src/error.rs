use thiserror::Error;

pub type SiscocaResult<T> = Result<T, SiscocaError>;

#[derive(Error, Debug)]
pub enum SiscocaError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Creative limit exceeded: {0}")]
    CreativeLimit(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
