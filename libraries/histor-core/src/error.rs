/// Core error types for Histor Radio
use thiserror::Error;

/// Result type alias using `HistorError`
pub type Result<T> = std::result::Result<T, HistorError>;

/// Core error type for Histor Radio
#[derive(Error, Debug)]
pub enum HistorError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl HistorError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
