//! Error types for commentlens

/// Result type alias using commentlens's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for commentlens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tokenizer backend could not be initialized or used
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Remote classification call failed
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Classification response could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Key/value store errors
    #[error("storage error: {0}")]
    Storage(String),

    /// The store refused a write because its quota is exhausted
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// A classification run is already in progress
    #[error("classification already running")]
    AlreadyRunning,

    /// The operation was cancelled before it started
    #[error("operation cancelled")]
    Cancelled,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new tokenizer error
    pub fn tokenizer(msg: impl Into<String>) -> Self {
        Self::Tokenizer(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new quota error
    pub fn quota(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a remote call failing with this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::AlreadyRunning | Self::Cancelled)
    }

    /// Whether this error is a storage quota failure
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}
