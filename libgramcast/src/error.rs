//! Error types for Gramcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GramcastError>;

#[derive(Error, Debug)]
pub enum GramcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Instagram API error: {0}")]
    Api(#[from] ApiError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Publish failed for post {post_id}: {message}")]
    PublishFailed { post_id: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GramcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            GramcastError::InvalidInput(_) => 3,
            GramcastError::NotFound(_) => 2,
            GramcastError::Config(_) => 1,
            GramcastError::Database(_) => 1,
            GramcastError::Api(_) => 1,
            GramcastError::PublishFailed { .. } => 1,
            GramcastError::Serialization(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures surfaced by the remote publishing client. The remote-supplied
/// message is preserved verbatim; interpreting it is the caller's job.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Remote error: {message}")]
    Remote {
        message: String,
        error_type: Option<String>,
        code: Option<i64>,
        trace_id: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Remote error carrying only a message, for callers that have no
    /// envelope metadata to attach.
    pub fn remote(message: impl Into<String>) -> Self {
        ApiError::Remote {
            message: message.into(),
            error_type: None,
            code: None,
            trace_id: None,
        }
    }
}
