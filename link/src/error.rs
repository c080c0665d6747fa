//! Error types for atrium-link.
//!
//! Every platform call returns [`Result<T>`]. Nothing here is retried by
//! callers; the error is turned into local state (a message, a denial) at the
//! nearest operation boundary.

use thiserror::Error;

/// Result type for platform client operations
pub type Result<T> = std::result::Result<T, AtriumLinkError>;

/// Errors raised by the platform client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtriumLinkError {
    /// Transport failure (DNS, TCP, TLS, connection reset)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Credentials rejected or session missing/expired
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Missing or malformed client configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Operation did not complete in time
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Input rejected before any network call
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Non-2xx response from the platform
    #[error("Server error ({status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Realtime socket failure
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Realtime channel rejected or closed by the platform
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A single-row query matched no rows
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AtriumLinkError {
    /// True for errors that mean the session is no longer usable.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => true,
            Self::ServerError { status_code, .. } => *status_code == 401,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AtriumLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else if err.is_decode() {
            Self::SerializationError(err.to_string())
        } else if let Some(status) = err.status() {
            Self::ServerError {
                status_code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AtriumLinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
