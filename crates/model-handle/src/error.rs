//! Error types for the model handle
//!
//! Executor failures propagate through the handle unchanged. "No match" is
//! never an error here: lookups return `Option` and boolean operations
//! return `false`.

/// Result type alias for model handle operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for model handle operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(String),

    /// Record required by the caller was not found
    #[error("Record not found in table '{0}'")]
    NotFound(String),

    /// No model is registered under the given type name
    #[error("Unknown model type '{0}'")]
    UnknownModel(String),

    /// A destructive operation was attempted without any predicate
    #[error("Refusing to {operation} on '{table}' without a condition")]
    MissingCondition { operation: &'static str, table: String },

    /// Relationship loading failed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Query building error
    #[error("Query error: {0}")]
    Query(String),

    /// Connection pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ModelError::Connection(err.to_string())
            }
            other => ModelError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
