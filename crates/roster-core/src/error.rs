//! Crate-wide error types
//!
//! Failures are classified by origin: the connection collaborator
//! (`ConnectionError`, wrapped here), the profile collaborator, and local
//! configuration/IO. None of them are fatal; roster state stays at its
//! last-known-good values and the next reconnect resynchronizes it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::ConnectionError;

/// Roster error type
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RosterError {
    /// A collaborator API call or send failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Profile collaborator failed to produce the own profile
    #[error("Profile error: {0}")]
    Profile(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RosterError> for String {
    fn from(error: RosterError) -> String {
        error.to_string()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RosterError>;

impl From<ConnectionError> for RosterError {
    fn from(err: ConnectionError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_conversion() {
        let err: RosterError = ConnectionError::Closed.into();
        assert!(matches!(err, RosterError::Connection(_)));
        assert_eq!(err.to_string(), "Connection error: Connection closed");
    }

    #[test]
    fn test_error_serializes_tagged() {
        let err = RosterError::Profile("not found".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Profile");
        assert_eq!(json["message"], "not found");
    }
}
