//! Error types for the vademecum library.

use thiserror::Error;

/// Main error type for manual operations.
#[derive(Debug, Error)]
pub enum ManualError {
    /// A referenced item id is absent from the store.
    #[error("item '{0}' not found")]
    NotFound(String),

    /// An insert collides with an existing item id.
    #[error("item '{0}' already exists")]
    DuplicateId(String),

    /// The operation is illegal for the item's current status.
    #[error("invalid state for item '{id}': {message}")]
    InvalidState { id: String, message: String },

    /// A dependency edge would close a cycle in the dependency graph.
    #[error("dependency cycle: {0}")]
    CycleDetected(String),

    /// A referenced dependency id does not exist in the store.
    #[error("dangling dependency '{0}'")]
    DanglingDependency(String),

    /// Malformed delta or argument (missing payload, bad confidence, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reading or writing a persisted snapshot.
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Result type alias for manual operations.
pub type Result<T> = std::result::Result<T, ManualError>;
