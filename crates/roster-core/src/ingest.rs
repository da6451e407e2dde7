//! Ordered event ingestion
//!
//! Inbound items are applied strictly in arrival order. Follow-ups run as
//! tasks on a [`JoinSet`] so a slow fetch never holds up the stream; their
//! failures are logged and counted, never fatal.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::config::RosterConfig;
use crate::error::Result;
use crate::protocol::{ConnectionEvent, Inbound, ServerMessage};
use crate::roster::Roster;
use crate::state::{Followup, RosterState};

impl RosterState {
    /// Apply the synchronous part of one inbound item.
    ///
    /// `own_identity` is the character the connection logged in as.
    pub fn apply(&mut self, inbound: Inbound, own_identity: &str) -> Option<Followup> {
        match inbound {
            Inbound::Lifecycle(ConnectionEvent::Connecting { is_reconnect }) => {
                Some(self.begin_connecting(is_reconnect))
            }
            Inbound::Lifecycle(ConnectionEvent::Connected { is_reconnect }) => {
                self.on_connected(is_reconnect)
            }
            Inbound::Message(message) => self.apply_message(message, own_identity),
        }
    }

    fn apply_message(&mut self, message: ServerMessage, own_identity: &str) -> Option<Followup> {
        tracing::debug!("Applying {}", message.code());
        match message {
            ServerMessage::PresenceBatch { characters } => {
                self.apply_presence_batch(characters);
                None
            }
            ServerMessage::Online {
                identity,
                gender,
                status,
            } => self.character_online(&identity, gender, status, own_identity),
            ServerMessage::Offline { character } => {
                self.character_offline(&character);
                None
            }
            ServerMessage::StatusUpdate {
                character,
                status,
                statusmsg,
            } => {
                self.status_update(&character, status, &statusmsg);
                None
            }
            ServerMessage::Ignore(action) => {
                self.apply_ignore(action);
                None
            }
            ServerMessage::OpList { ops } => {
                self.set_op_list(ops);
                None
            }
            ServerMessage::OpAdd { character } => {
                self.add_op(&character);
                None
            }
            ServerMessage::OpRemove { character } => {
                self.remove_op(&character);
                None
            }
            ServerMessage::Relationship(change) => self.apply_relationship(change),
        }
    }
}

/// Counters reported when ingestion stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub processed: u64,
    pub followups: u64,
    pub failed: u64,
}

/// Drives a [`Roster`] from an ordered inbound stream
pub struct EventIngestion {
    roster: Roster,
    tasks: JoinSet<Result<()>>,
    stats: IngestStats,
}

enum Next {
    Inbound(Option<Inbound>),
    Finished(std::result::Result<Result<()>, JoinError>),
}

impl EventIngestion {
    pub fn new(roster: Roster) -> Self {
        Self {
            roster,
            tasks: JoinSet::new(),
            stats: IngestStats::default(),
        }
    }

    /// Inbound channel sized from the configuration
    pub fn channel(config: &RosterConfig) -> (mpsc::Sender<Inbound>, mpsc::Receiver<Inbound>) {
        mpsc::channel(config.ingest_buffer.max(1))
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Apply one item and spawn its follow-up
    pub async fn ingest_one(&mut self, inbound: Inbound) {
        self.stats.processed += 1;
        if let Some(followup) = self.roster.ingest(inbound).await {
            self.stats.followups += 1;
            let roster = self.roster.clone();
            self.tasks.spawn(async move { roster.complete(followup).await });
        }
    }

    /// Consume `rx` until every sender is dropped, then wait for the
    /// outstanding follow-ups
    pub async fn run(mut self, mut rx: mpsc::Receiver<Inbound>) -> IngestStats {
        loop {
            let next = tokio::select! {
                inbound = rx.recv() => Next::Inbound(inbound),
                Some(finished) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    Next::Finished(finished)
                }
            };
            match next {
                Next::Inbound(Some(inbound)) => self.ingest_one(inbound).await,
                Next::Inbound(None) => break,
                Next::Finished(finished) => self.reap(finished),
            }
        }
        self.drain().await;
        tracing::info!(
            "Ingestion finished: {} events, {} follow-ups, {} failed",
            self.stats.processed,
            self.stats.followups,
            self.stats.failed
        );
        self.stats
    }

    /// Wait for every outstanding follow-up
    pub async fn drain(&mut self) {
        while let Some(finished) = self.tasks.join_next().await {
            self.reap(finished);
        }
    }

    fn reap(&mut self, finished: std::result::Result<Result<()>, JoinError>) {
        match finished {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.stats.failed += 1;
                tracing::error!("Roster follow-up failed: {}", e);
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::error!("Roster follow-up task panicked: {}", e);
            }
        }
    }
}
