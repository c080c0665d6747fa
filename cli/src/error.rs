//! Error types for atrium-cli
//!
//! Wraps library errors with messages meant for an operator's terminal.

use atrium_link::AtriumLinkError;
use atrium_session::SessionError;
use std::fmt;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CLIError>;

/// Errors that can occur in the CLI
#[derive(Debug)]
pub enum CLIError {
    /// Error from atrium-link
    LinkError(AtriumLinkError),

    /// Error from atrium-session
    SessionError(SessionError),

    /// Configuration file or environment error
    ConfigurationError(String),

    /// File I/O error
    FileError(String),

    /// Logging could not be installed
    LoggingError(String),

    /// One or more connectivity checks failed
    CheckFailed { failed: usize, total: usize },
}

impl CLIError {
    fn format_link_error(err: &AtriumLinkError) -> String {
        match err {
            AtriumLinkError::NetworkError(msg) => Self::clean_nested_message(msg),
            AtriumLinkError::ServerError {
                status_code,
                message,
            } => format!("Server error ({}): {}", status_code, message),
            other => other.to_string(),
        }
    }

    fn clean_nested_message(message: &str) -> String {
        let mut cleaned = message.trim();
        let prefixes = ["Connection failed:", "Network error:", "error sending request:"];

        while let Some(rest) = prefixes.iter().find_map(|p| cleaned.strip_prefix(p)) {
            cleaned = rest.trim_start();
        }

        cleaned.to_string()
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CLIError::ConfigurationError(_) => 78,
            CLIError::CheckFailed { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CLIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CLIError::LinkError(e) => write!(f, "{}", Self::format_link_error(e)),
            CLIError::SessionError(SessionError::Link(e)) => {
                write!(f, "{}", Self::format_link_error(e))
            },
            CLIError::SessionError(e) => write!(f, "{}", e),
            CLIError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CLIError::FileError(msg) => write!(f, "File error: {}", msg),
            CLIError::LoggingError(msg) => write!(f, "Logging error: {}", msg),
            CLIError::CheckFailed { failed, total } => {
                write!(f, "{} of {} checks failed", failed, total)
            },
        }
    }
}

impl std::error::Error for CLIError {}

impl From<AtriumLinkError> for CLIError {
    fn from(err: AtriumLinkError) -> Self {
        match err {
            AtriumLinkError::ConfigurationError(msg) => CLIError::ConfigurationError(msg),
            other => CLIError::LinkError(other),
        }
    }
}

impl From<SessionError> for CLIError {
    fn from(err: SessionError) -> Self {
        CLIError::SessionError(err)
    }
}

impl From<std::io::Error> for CLIError {
    fn from(err: std::io::Error) -> Self {
        CLIError::FileError(err.to_string())
    }
}

impl From<toml::de::Error> for CLIError {
    fn from(err: toml::de::Error) -> Self {
        CLIError::ConfigurationError(format!("TOML parse error: {}", err))
    }
}
