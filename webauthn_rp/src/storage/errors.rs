use thiserror::Error;

/// Failure reported by a session, credential or trust-anchor store.
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    /// Backend unavailable or rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored record could not be (de)serialized
    #[error("Record encoding error: {0}")]
    Serde(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// User handle or credential ID already taken
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
