//! Roster Change Sink
//!
//! Roster mutations are published as [`RosterChange`]s through a
//! [`RosterSink`], which decouples the roster from whatever consumes it
//! (a GUI, the replay CLI, tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::RosterConfig;
use crate::overrides::OverrideKind;

/// A roster list or derived presence view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RosterList {
    /// Online global friends
    Friends,
    /// Online bookmarks
    Bookmarks,
    /// Online character-specific friends
    CharacterFriends,
    FriendList,
    BookmarkList,
    IgnoreList,
    OpList,
    CharacterFriendList,
}

/// A single observable roster mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum RosterChange {
    CharacterUpdated { name: String },
    ListChanged { list: RosterList },
    OwnCharacterChanged { name: String },
    OwnProfileResolved { name: String },
    OverrideChanged { name: String, kind: OverrideKind },
}

/// A change tagged with the roster version it produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterUpdate {
    pub version: u64,
    #[serde(flatten)]
    pub change: RosterChange,
}

/// Sink for roster change notifications
#[async_trait]
pub trait RosterSink: Send + Sync {
    /// Emit one change belonging to mutation batch `version`
    async fn emit_change(&self, version: u64, change: &RosterChange) -> Result<(), String>;
}

/// No-op sink for tests or headless use
#[derive(Default, Clone)]
pub struct NoOpRosterSink;

#[async_trait]
impl RosterSink for NoOpRosterSink {
    async fn emit_change(&self, _version: u64, _change: &RosterChange) -> Result<(), String> {
        Ok(())
    }
}

/// Stdout sink for CLI mode - prints changes to console
#[derive(Default, Clone)]
pub struct StdoutRosterSink {
    /// Whether to print in JSON format
    pub json_output: bool,
}

impl StdoutRosterSink {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }
}

#[async_trait]
impl RosterSink for StdoutRosterSink {
    async fn emit_change(&self, version: u64, change: &RosterChange) -> Result<(), String> {
        if self.json_output {
            let update = RosterUpdate {
                version,
                change: change.clone(),
            };
            let line = serde_json::to_string(&update).map_err(|e| e.to_string())?;
            println!("{line}");
        } else {
            println!("[v{version}] {}", describe(change));
        }
        Ok(())
    }
}

fn describe(change: &RosterChange) -> String {
    match change {
        RosterChange::CharacterUpdated { name } => format!("character updated: {name}"),
        RosterChange::ListChanged { list } => format!("list changed: {list:?}"),
        RosterChange::OwnCharacterChanged { name } => format!("own character: {name}"),
        RosterChange::OwnProfileResolved { name } => format!("own profile resolved: {name}"),
        RosterChange::OverrideChanged { name, kind } => {
            format!("override {kind:?} changed: {name}")
        }
    }
}

/// Broadcast sink for reactive consumers; each subscriber sees every update
#[derive(Clone)]
pub struct ChannelRosterSink {
    tx: broadcast::Sender<RosterUpdate>,
}

impl ChannelRosterSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn from_config(config: &RosterConfig) -> Self {
        Self::new(config.change_buffer)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RosterUpdate> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl RosterSink for ChannelRosterSink {
    async fn emit_change(&self, version: u64, change: &RosterChange) -> Result<(), String> {
        // Having no subscribers is fine
        let _ = self.tx.send(RosterUpdate {
            version,
            change: change.clone(),
        });
        Ok(())
    }
}
