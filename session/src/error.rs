//! Error types for atrium-session

use atrium_link::AtriumLinkError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A role string outside `admin | editor | user`
    #[error("Unknown role: '{0}'")]
    UnknownRole(String),

    #[error("Unknown permission: '{0}'")]
    UnknownPermission(String),

    /// The profile record exists but its role column is not a string
    #[error("Malformed profile: {0}")]
    MalformedProfile(String),

    /// Rejected while building a route table
    #[error("Invalid route table: {0}")]
    InvalidRouteTable(String),

    #[error(transparent)]
    Link(#[from] AtriumLinkError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
