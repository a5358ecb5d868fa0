//! Error types shared by the transport, adapters, and state machines.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Client error taxonomy.
///
/// Every failing operation resolves with one of these; the state machines
/// store the display string so the UI can show server-provided message text
/// verbatim when the backend supplied one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Transport-level failure, no interpretable response
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Backend rejected the credential; it has been cleared locally
    #[error("Unauthorized")]
    Unauthorized,

    /// Backend answered with a non-success status
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Malformed request caught before dispatch
    #[error("Validation error: {0}")]
    Validation(String),

    /// NL→SQL generation step failed
    #[error("{0}")]
    Generation(String),

    /// SQL execution failed
    #[error("{0}")]
    Execution(String),

    /// History/sharing mutation rejected by the backend
    #[error("{0}")]
    Sync(String),

    /// Report generation failed
    #[error("{0}")]
    Report(String),

    /// Operation called in a state that does not accept it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a decoding error
    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a generation error
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a sync error
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Create a report error
    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    /// Create an invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decoding(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
