//! Error types for the scanner workers
//!
//! Each variant maps to one failure class of the message pipeline. Handlers
//! decide per variant whether to abort, degrade, or synthesize a response.

/// Main error type for worker operations
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("DNS error: {0}")]
    Dns(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Whether redelivering the same message could succeed later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Nats(_) | Self::Dns(_) | Self::Timeout(_)
        )
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}

impl From<bson::ser::Error> for WorkerError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(format!("BSON error: {}", err))
    }
}

impl From<async_nats::Error> for WorkerError {
    fn from(err: async_nats::Error) -> Self {
        Self::Nats(err.to_string())
    }
}

impl From<mongodb::error::Error> for WorkerError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for WorkerError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(err.to_string())
    }
}

impl From<reqwest::Error> for WorkerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Notification(err.to_string())
    }
}

/// Result type alias for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;
