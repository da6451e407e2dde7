//! Shared roster handle
//!
//! [`Roster`] owns the state behind a tokio mutex together with the
//! collaborators it needs for follow-ups. The lock is only ever held for
//! synchronous mutation, never across an API call or a sink, so inbound
//! events keep flowing while a fetch is outstanding. Each change batch takes
//! its version under the lock and is emitted after the lock is released, in
//! version order.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::character::Character;
use crate::config::RosterConfig;
use crate::connection::{fetch, CharacterProfile, Connection, ProfileSource};
use crate::error::{Result, RosterError};
use crate::events::{RosterChange, RosterSink};
use crate::overrides::OverrideInput;
use crate::protocol::{ApiEndpoint, BookmarkListResponse, FriendListResponse, Inbound};
use crate::registry::CharacterKey;
use crate::state::{Followup, RosterSnapshot, RosterState};

/// Cloneable handle to the roster
#[derive(Clone)]
pub struct Roster {
    state: Arc<Mutex<RosterState>>,
    /// Version of the last batch handed to the sink
    published: Arc<watch::Sender<u64>>,
    connection: Arc<dyn Connection>,
    profiles: Arc<dyn ProfileSource>,
    sink: Arc<dyn RosterSink>,
    config: RosterConfig,
}

impl Roster {
    pub fn new(
        connection: Arc<dyn Connection>,
        profiles: Arc<dyn ProfileSource>,
        sink: Arc<dyn RosterSink>,
        config: RosterConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RosterState::new())),
            published: Arc::new(watch::channel(0).0),
            connection,
            profiles,
            sink,
            config,
        }
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Apply the synchronous part of one inbound item.
    ///
    /// Must be called in arrival order. The returned follow-up, if any, can
    /// be completed concurrently with later calls.
    pub async fn ingest(&self, inbound: Inbound) -> Option<Followup> {
        let own_identity = self.connection.character();
        self.mutate(|state| state.apply(inbound, own_identity)).await
    }

    /// Run the asynchronous tail of a handler.
    ///
    /// Fetched results are applied under the lock only if they are still
    /// current; stale results are dropped. On error, state keeps its
    /// last-known-good values.
    pub async fn complete(&self, followup: Followup) -> Result<()> {
        match followup {
            Followup::Resync { epoch } => {
                let bookmarks: BookmarkListResponse =
                    fetch(&*self.connection, ApiEndpoint::BookmarkList).await?;
                let friends: FriendListResponse =
                    fetch(&*self.connection, ApiEndpoint::FriendList).await?;
                self.mutate(|state| {
                    state.finish_resync(epoch, bookmarks.characters, &friends.friends)
                })
                .await;
            }
            Followup::ReplayStatus(command) => {
                self.connection.send_status(&command).await?;
                tracing::info!("Restored status {} after reconnect", command.status);
            }
            Followup::RefreshCharacterFriends { epoch, seq } => {
                let friends: FriendListResponse =
                    fetch(&*self.connection, ApiEndpoint::FriendList).await?;
                self.mutate(|state| {
                    state.apply_character_friend_edges(epoch, seq, None, &friends.friends)
                })
                .await;
            }
            Followup::ConfirmIdentity { epoch, seq, own } => {
                let friends: FriendListResponse =
                    fetch(&*self.connection, ApiEndpoint::FriendList).await?;
                // A newer refresh may have overtaken this fetch; the profile
                // is still ours to resolve as long as the identity holds.
                let current = self
                    .mutate(|state| {
                        state.apply_character_friend_edges(epoch, seq, Some(&own), &friends.friends);
                        state.is_current_identity(epoch, &own)
                    })
                    .await;
                if current && self.config.resolve_own_profile {
                    self.resolve_own_profile(&own).await?;
                }
            }
        }
        Ok(())
    }

    /// Ingest one item and run its follow-up to completion
    pub async fn handle(&self, inbound: Inbound) -> Result<()> {
        if let Some(followup) = self.ingest(inbound).await {
            self.complete(followup).await?;
        }
        Ok(())
    }

    async fn resolve_own_profile(&self, own: &CharacterKey) -> Result<()> {
        let Some(name) = self
            .read(|state| state.character(own.as_str()).map(|c| c.name.clone()))
            .await
        else {
            return Ok(());
        };

        self.profiles
            .load_fields()
            .await
            .map_err(|e| RosterError::Profile(e.to_string()))?;
        let profile = self
            .profiles
            .character_data(&name)
            .await
            .map_err(|e| RosterError::Profile(e.to_string()))?;

        self.mutate(|state| state.set_own_profile(own, profile)).await;
        Ok(())
    }

    /// Set or clear a local display override
    pub async fn set_override(&self, name: &str, input: OverrideInput) -> bool {
        self.mutate(|state| state.set_override(name, input)).await
    }

    /// Run `f` against the current state
    pub async fn read<R>(&self, f: impl FnOnce(&RosterState) -> R) -> R {
        let state = self.state.lock().await;
        f(&*state)
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        self.read(RosterState::snapshot).await
    }

    pub async fn character(&self, name: &str) -> Option<Character> {
        self.read(|state| state.character(name).cloned()).await
    }

    pub async fn friends(&self) -> Vec<Character> {
        self.read(|state| state.friends().into_iter().cloned().collect())
            .await
    }

    pub async fn bookmarks(&self) -> Vec<Character> {
        self.read(|state| state.bookmarks().into_iter().cloned().collect())
            .await
    }

    pub async fn character_friends(&self) -> Vec<Character> {
        self.read(|state| state.character_friends().into_iter().cloned().collect())
            .await
    }

    pub async fn own_character(&self) -> Option<Character> {
        self.read(|state| state.own_character().cloned()).await
    }

    pub async fn own_profile(&self) -> Option<CharacterProfile> {
        self.read(|state| state.own_profile().cloned()).await
    }

    pub async fn version(&self) -> u64 {
        self.read(RosterState::version).await
    }

    /// Mutate under the lock, then publish the batch once it is released
    async fn mutate<R>(&self, f: impl FnOnce(&mut RosterState) -> R) -> R {
        let (result, version, changes) = {
            let mut state = self.state.lock().await;
            let result = f(&mut *state);
            let (version, changes) = state.take_changes();
            (result, version, changes)
        };
        if !changes.is_empty() {
            self.publish(version, &changes).await;
        }
        result
    }

    /// Emit batch `version` once every earlier batch has been emitted.
    ///
    /// Versions of non-empty batches are contiguous, so the batch before
    /// this one is always `version - 1`.
    async fn publish(&self, version: u64, changes: &[RosterChange]) {
        let _turn = PublishTurn {
            published: &self.published,
            version,
        };
        let mut published = self.published.subscribe();
        let _ = published.wait_for(|last| *last + 1 >= version).await;

        for change in changes {
            if let Err(e) = self.sink.emit_change(version, change).await {
                tracing::warn!("Failed to emit roster change: {}", e);
            }
        }
    }
}

/// Marks a batch as emitted when dropped, even if the publishing task was
/// cancelled mid-batch
struct PublishTurn<'a> {
    published: &'a watch::Sender<u64>,
    version: u64,
}

impl Drop for PublishTurn<'_> {
    fn drop(&mut self) {
        let version = self.version;
        self.published.send_modify(|last| *last = (*last).max(version));
    }
}
