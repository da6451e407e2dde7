//! Transcript replay
//!
//! Feeds a recorded inbound stream (one JSON item per line) through the
//! roster core, answering its API queries from a fixture file instead of a
//! live site.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roster_core::connection::{CharacterProfile, Connection, ConnectionError, ProfileSource};
use roster_core::events::RosterSink;
use roster_core::ingest::{EventIngestion, IngestStats};
use roster_core::protocol::{ApiEndpoint, FriendEdge, Inbound, StatusCommand};
use roster_core::{Roster, RosterConfig, RosterSnapshot};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// API responses and profiles served during replay
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Character the recorded connection logged in as
    pub character: String,
    pub bookmarks: Vec<String>,
    pub friends: Vec<FriendEdge>,
    pub profiles: HashMap<String, serde_json::Value>,
}

impl Fixture {
    pub fn from_json_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read fixture {}: {e}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| format!("Invalid fixture {}: {e}", path.display()))
    }
}

/// Connection and profile source backed by a [`Fixture`]
pub struct FixtureConnection {
    fixture: Fixture,
    sent: Mutex<Vec<StatusCommand>>,
}

impl FixtureConnection {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Status commands the roster sent during replay
    pub fn sent(&self) -> Vec<StatusCommand> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Connection for FixtureConnection {
    fn character(&self) -> &str {
        &self.fixture.character
    }

    async fn query_api(&self, endpoint: ApiEndpoint) -> Result<serde_json::Value, ConnectionError> {
        tracing::debug!("Serving {} from fixture", endpoint);
        let body = match endpoint {
            ApiEndpoint::BookmarkList => {
                serde_json::json!({ "characters": self.fixture.bookmarks })
            }
            ApiEndpoint::FriendList => serde_json::json!({ "friends": self.fixture.friends }),
        };
        Ok(body)
    }

    async fn send_status(&self, command: &StatusCommand) -> Result<(), ConnectionError> {
        tracing::info!("-> STA {} \"{}\"", command.status, command.statusmsg);
        self.sent
            .lock()
            .map_err(|e| ConnectionError::Send(e.to_string()))?
            .push(command.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for FixtureConnection {
    async fn load_fields(&self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn character_data(&self, name: &str) -> Result<CharacterProfile, ConnectionError> {
        let data = self
            .fixture
            .profiles
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| ConnectionError::Api {
                endpoint: "character-data".to_string(),
                message: format!("no profile for {name} in fixture"),
            })?;
        Ok(CharacterProfile {
            name: name.to_string(),
            data,
        })
    }
}

/// Outcome of a replay run
pub struct ReplayOutcome {
    pub stats: IngestStats,
    pub skipped: u64,
    pub snapshot: RosterSnapshot,
}

/// Replay every line of `reader` through a fresh roster
pub async fn run_replay<R>(
    reader: R,
    connection: Arc<FixtureConnection>,
    sink: Arc<dyn RosterSink>,
    config: RosterConfig,
) -> Result<ReplayOutcome, String>
where
    R: AsyncBufRead + Unpin,
{
    let roster = Roster::new(connection.clone(), connection, sink, config);
    let (tx, rx) = EventIngestion::channel(roster.config());
    let ingestion = tokio::spawn(EventIngestion::new(roster.clone()).run(rx));

    let mut lines = reader.lines();
    let mut line_number = 0u64;
    let mut skipped = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading transcript: {}", e);
                break;
            }
        };
        line_number += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<Inbound>(line) {
            Ok(inbound) => {
                if tx.send(inbound).await.is_err() {
                    tracing::error!("Ingestion stopped early");
                    break;
                }
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping line {}: {}", line_number, e);
            }
        }
    }
    drop(tx);

    let stats = ingestion
        .await
        .map_err(|e| format!("Ingestion task failed: {e}"))?;
    Ok(ReplayOutcome {
        stats,
        skipped,
        snapshot: roster.snapshot().await,
    })
}

/// Human-readable summary of a snapshot
pub fn format_summary(snapshot: &RosterSnapshot) -> String {
    let own = snapshot.own_character.as_deref().unwrap_or("(unknown)");
    let online = snapshot
        .characters
        .iter()
        .filter(|c| c.is_online())
        .count();
    let mut out = format!(
        "Own character:     {own}\nKnown characters:  {} ({online} online)\n",
        snapshot.characters.len()
    );
    for (label, names) in [
        ("Online friends:", &snapshot.friends),
        ("Online bookmarks:", &snapshot.bookmarks),
        ("Character friends:", &snapshot.character_friends),
        ("Ignored:", &snapshot.ignore_list),
    ] {
        out.push_str(&format!("{label:<19}{}\n", names.join(", ")));
    }
    out.push_str(&format!("Version:           {}", snapshot.version));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::events::ChannelRosterSink;
    use roster_core::RosterChange;
    use serde_json::json;

    fn fixture() -> Fixture {
        serde_json::from_value(json!({
            "character": "Alice",
            "bookmarks": ["Carol"],
            "friends": [
                { "source": "Alice", "dest": "Bob", "last_online": 0 },
                { "source": "Zed", "dest": "Dave", "last_online": 0 }
            ],
            "profiles": { "alice": { "species": "fox" } }
        }))
        .unwrap()
    }

    const TRANSCRIPT: &str = r#"
# fresh session
{"event": "connecting", "isReconnect": false}
{"event": "connected", "isReconnect": false}
{"cmd": "IGN", "data": {"action": "init", "characters": ["Eve"]}}
{"cmd": "LIS", "data": {"characters": [["Bob", "Male", "online", ""], ["Carol", "Female", "busy", "afk"]]}}
{"cmd": "NLN", "data": {"identity": "Alice", "gender": "Female", "status": "online"}}
not json at all
{"cmd": "FLN", "data": {"character": "Carol"}}
"#;

    #[tokio::test]
    async fn test_replay_transcript() {
        let connection = Arc::new(FixtureConnection::new(fixture()));
        let sink = Arc::new(ChannelRosterSink::new(256));
        let mut rx = sink.subscribe();

        let outcome = run_replay(
            TRANSCRIPT.as_bytes(),
            connection.clone(),
            sink,
            RosterConfig::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.stats.processed, 6);
        assert_eq!(outcome.stats.failed, 0);

        let snapshot = &outcome.snapshot;
        assert_eq!(snapshot.own_character.as_deref(), Some("Alice"));
        assert_eq!(snapshot.friends, vec!["Bob"]);
        assert!(snapshot.bookmarks.is_empty());
        assert_eq!(snapshot.character_friends, vec!["Bob"]);
        assert_eq!(snapshot.ignore_list, vec!["eve"]);
        assert_eq!(
            snapshot.own_profile.as_ref().unwrap().data["species"],
            "fox"
        );

        let mut saw_profile = false;
        while let Ok(update) = rx.try_recv() {
            if matches!(update.change, RosterChange::OwnProfileResolved { .. }) {
                saw_profile = true;
            }
        }
        assert!(saw_profile);
        assert!(connection.sent().is_empty());
    }

    #[tokio::test]
    async fn test_fixture_profiles_are_case_insensitive() {
        let connection = FixtureConnection::new(fixture());
        let profile = connection.character_data("ALICE").await.unwrap();
        assert_eq!(profile.name, "ALICE");
        assert!(connection.character_data("Bob").await.is_err());
    }

    #[test]
    fn test_format_summary() {
        let snapshot: RosterSnapshot = {
            let mut state = roster_core::RosterState::new();
            state.apply(
                serde_json::from_value(json!({
                    "cmd": "NLN",
                    "data": { "identity": "Alice" }
                }))
                .unwrap(),
                "Alice",
            );
            state.snapshot()
        };
        let summary = format_summary(&snapshot);
        assert!(summary.contains("Own character:     Alice"));
        assert!(summary.contains("1 online"));
    }

    #[test]
    fn test_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, r#"{ "character": "Alice" }"#).unwrap();

        let fixture = Fixture::from_json_file(&path).unwrap();
        assert_eq!(fixture.character, "Alice");
        assert!(fixture.friends.is_empty());
        assert!(Fixture::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
