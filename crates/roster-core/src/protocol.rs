//! Chat Protocol Types
//!
//! Typed inbound messages and lifecycle events, as delivered by the
//! connection in arrival order, plus the API response shapes the roster
//! fetches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::character::{Gender, Status};

/// Connection lifecycle events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ConnectionEvent {
    /// Fired for fresh connects and for every reconnect attempt
    Connecting {
        #[serde(rename = "isReconnect", default)]
        is_reconnect: bool,
    },
    Connected {
        #[serde(rename = "isReconnect", default)]
        is_reconnect: bool,
    },
}

/// One entry of a presence batch: `[name, gender, status, text]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceEntry(pub String, pub Gender, pub Status, pub String);

/// Ignore list actions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum IgnoreAction {
    Init { characters: Vec<String> },
    Add { character: String },
    Delete { character: String },
}

/// Relationship change kinds; the server sends many more, which are ignored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum RelationshipKind {
    BookmarkAdd,
    BookmarkRemove,
    FriendAdd,
    FriendRemove,
    Other(String),
}

impl From<String> for RelationshipKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "trackadd" => RelationshipKind::BookmarkAdd,
            "trackrem" => RelationshipKind::BookmarkRemove,
            "friendadd" => RelationshipKind::FriendAdd,
            "friendremove" => RelationshipKind::FriendRemove,
            _ => RelationshipKind::Other(value),
        }
    }
}

impl From<RelationshipKind> for String {
    fn from(kind: RelationshipKind) -> String {
        match kind {
            RelationshipKind::BookmarkAdd => "trackadd".to_string(),
            RelationshipKind::BookmarkRemove => "trackrem".to_string(),
            RelationshipKind::FriendAdd => "friendadd".to_string(),
            RelationshipKind::FriendRemove => "friendremove".to_string(),
            RelationshipKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipChange {
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    #[serde(default)]
    pub name: String,
}

/// Typed server messages that affect the roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", content = "data")]
pub enum ServerMessage {
    /// Initial presence snapshot
    #[serde(rename = "LIS")]
    PresenceBatch { characters: Vec<PresenceEntry> },
    /// A character came online (or our own identity was confirmed)
    #[serde(rename = "NLN")]
    Online {
        identity: String,
        #[serde(default)]
        gender: Gender,
        #[serde(default = "default_online_status")]
        status: Status,
    },
    #[serde(rename = "FLN")]
    Offline { character: String },
    #[serde(rename = "STA")]
    StatusUpdate {
        character: String,
        status: Status,
        #[serde(default)]
        statusmsg: String,
    },
    #[serde(rename = "IGN")]
    Ignore(IgnoreAction),
    /// Full chat-operator list
    #[serde(rename = "ADL")]
    OpList { ops: Vec<String> },
    #[serde(rename = "AOP")]
    OpAdd { character: String },
    #[serde(rename = "DOP")]
    OpRemove { character: String },
    #[serde(rename = "RTB")]
    Relationship(RelationshipChange),
}

fn default_online_status() -> Status {
    Status::Online
}

impl ServerMessage {
    /// Three-letter protocol code, for logging
    pub fn code(&self) -> &'static str {
        match self {
            ServerMessage::PresenceBatch { .. } => "LIS",
            ServerMessage::Online { .. } => "NLN",
            ServerMessage::Offline { .. } => "FLN",
            ServerMessage::StatusUpdate { .. } => "STA",
            ServerMessage::Ignore(_) => "IGN",
            ServerMessage::OpList { .. } => "ADL",
            ServerMessage::OpAdd { .. } => "AOP",
            ServerMessage::OpRemove { .. } => "DOP",
            ServerMessage::Relationship(_) => "RTB",
        }
    }
}

/// One item of the ordered inbound stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Inbound {
    Lifecycle(ConnectionEvent),
    Message(ServerMessage),
}

impl From<ConnectionEvent> for Inbound {
    fn from(event: ConnectionEvent) -> Self {
        Inbound::Lifecycle(event)
    }
}

impl From<ServerMessage> for Inbound {
    fn from(message: ServerMessage) -> Self {
        Inbound::Message(message)
    }
}

/// Client command replaying our own status: `STA`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCommand {
    pub status: Status,
    pub statusmsg: String,
}

/// Read-only API endpoints the roster queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ApiEndpoint {
    BookmarkList,
    FriendList,
}

impl ApiEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            ApiEndpoint::BookmarkList => "bookmark-list.php",
            ApiEndpoint::FriendList => "friend-list.php",
        }
    }
}

impl fmt::Display for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A friendship edge between two characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendEdge {
    pub source: String,
    pub dest: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_online: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FriendListResponse {
    #[serde(default)]
    pub friends: Vec<FriendEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BookmarkListResponse {
    #[serde(default)]
    pub characters: Vec<String>,
}
