use thiserror::Error;

/// Errors raised by a gene record source.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid gene record: {message}")]
    InvalidRecord { message: String },

    #[error("Gene source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new SourceUnavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Check if this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRecord { .. } | Self::JsonError(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
