//! Collaborator seams: the chat connection and the profile store
//!
//! Framing, transport and retry live behind these traits; the roster only
//! needs typed reads, one outbound command, and the logged-in identity.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::protocol::{ApiEndpoint, StatusCommand};

/// The live chat connection, as seen by the roster
#[async_trait]
pub trait Connection: Send + Sync {
    /// Name of the character this connection logged in as
    fn character(&self) -> &str;

    /// Query an idempotent read endpoint of the site API
    async fn query_api(&self, endpoint: ApiEndpoint) -> Result<serde_json::Value, ConnectionError>;

    /// Send our own status (`STA`) to the server
    async fn send_status(&self, command: &StatusCommand) -> Result<(), ConnectionError>;
}

/// Query `endpoint` and decode the response body
pub async fn fetch<T: DeserializeOwned>(
    connection: &dyn Connection,
    endpoint: ApiEndpoint,
) -> Result<T, ConnectionError> {
    let value = connection.query_api(endpoint).await?;
    serde_json::from_value(value).map_err(|e| ConnectionError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

/// Profile data for a character, in the profile collaborator's shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterProfile {
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Source of rich character profiles
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Load the profile field definitions; required before `character_data`
    async fn load_fields(&self) -> Result<(), ConnectionError>;

    async fn character_data(&self, name: &str) -> Result<CharacterProfile, ConnectionError>;
}

/// Profile source that never resolves anything, for headless use
#[derive(Debug, Default, Clone)]
pub struct NoProfiles;

#[async_trait]
impl ProfileSource for NoProfiles {
    async fn load_fields(&self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn character_data(&self, name: &str) -> Result<CharacterProfile, ConnectionError> {
        Err(ConnectionError::Api {
            endpoint: "character-data".to_string(),
            message: format!("no profile available for {name}"),
        })
    }
}

/// Errors that can occur talking to collaborators
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,

    #[error("API request to {endpoint} failed: {message}")]
    Api { endpoint: String, message: String },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode {
        endpoint: ApiEndpoint,
        message: String,
    },

    #[error("Failed to send command: {0}")]
    Send(String),
}

impl From<ConnectionError> for String {
    fn from(err: ConnectionError) -> String {
        err.to_string()
    }
}
