//! Roster Core Library
//!
//! Roster synchronization for a chat client: a registry of every character
//! the client has seen, kept in step with the server's presence stream and
//! the site's relationship lists. This crate holds no transport; the chat
//! connection and profile store are reached through traits.
//!
//! # Modules
//!
//! - [`character`] - Character record, status and gender enums
//! - [`registry`] - Case-insensitive character registry
//! - [`status`] - Status transitions and derived presence views
//! - [`lists`] - Friend, bookmark, ignore, op and character-friend lists
//! - [`reconnect`] - Connecting/connected handling and resync
//! - [`overrides`] - Local display overrides
//! - [`state`] - The roster state aggregate and snapshots
//! - [`ingest`] - Ordered event ingestion and follow-up tasks
//! - [`roster`] - Shared async roster handle
//! - [`protocol`] - Inbound message and API response types
//! - [`connection`] - Connection and profile collaborator traits
//! - [`events`] - Change sink trait for decoupling from consumers
//! - [`config`] - Configuration
//! - [`error`] - Error types

pub mod character;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod ingest;
pub mod lists;
pub mod overrides;
pub mod protocol;
pub mod reconnect;
pub mod registry;
pub mod roster;
pub mod state;
pub mod status;

// Re-export commonly used types
pub use character::{Character, CharacterColor, Gender, Status};
pub use config::RosterConfig;
pub use connection::{CharacterProfile, Connection, ConnectionError, NoProfiles, ProfileSource};
pub use error::{Result, RosterError};
pub use events::{
    ChannelRosterSink, NoOpRosterSink, RosterChange, RosterList, RosterSink, RosterUpdate,
    StdoutRosterSink,
};
pub use ingest::{EventIngestion, IngestStats};
pub use overrides::{OverrideInput, OverrideKind, Overrides};
pub use protocol::{
    ApiEndpoint, BookmarkListResponse, ConnectionEvent, FriendEdge, FriendListResponse,
    IgnoreAction, Inbound, PresenceEntry, RelationshipChange, RelationshipKind, ServerMessage,
    StatusCommand,
};
pub use registry::CharacterKey;
pub use roster::Roster;
pub use state::{Followup, RosterSnapshot, RosterState};
