use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid account key: {0}")]
    InvalidKey(String),

    #[error("The storage backend is unavailable: {0}")]
    Unavailable(String),
}
