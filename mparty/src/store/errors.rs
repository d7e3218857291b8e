//! Document store error types.

use thiserror::Error;

use super::DocPath;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document targeted by an update does not exist
    #[error("Document not found: {0}")]
    NotFound(DocPath),

    /// Optimistic precondition failed (document changed since it was read)
    #[error("Write conflict on {0}")]
    Conflict(DocPath),

    /// Field update could not be applied to the stored value
    #[error("Invalid field update on {path}: {reason}")]
    InvalidUpdate { path: DocPath, reason: String },

    /// Backend unreachable or refused the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether re-reading and retrying the operation may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
