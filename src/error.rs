use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuesError {
    #[error("No owner registered for flat: {0}")]
    OwnerNotFound(String),

    #[error("Invalid configuration entry '{key}': {details}")]
    InvalidConfig { key: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DuesError>;
