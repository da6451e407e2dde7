//! Scripted collaborators for the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roster_core::connection::{CharacterProfile, Connection, ConnectionError, ProfileSource};
use roster_core::events::NoOpRosterSink;
use roster_core::protocol::{ApiEndpoint, ServerMessage, StatusCommand};
use roster_core::{Gender, Inbound, RelationshipChange, RelationshipKind, Roster, RosterConfig, Status};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

/// Connection whose API answers are either static or released by the test
pub struct ScriptedConnection {
    character: String,
    responses: Mutex<HashMap<ApiEndpoint, Value>>,
    gates: Mutex<HashMap<ApiEndpoint, VecDeque<oneshot::Receiver<Value>>>>,
    failing: Mutex<bool>,
    started: mpsc::UnboundedSender<ApiEndpoint>,
    sent: Mutex<Vec<StatusCommand>>,
}

impl ScriptedConnection {
    /// Returns the connection and a receiver that yields each endpoint as
    /// its query starts
    pub fn new(character: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<ApiEndpoint>) {
        let (started, started_rx) = mpsc::unbounded_channel();
        let mut responses = HashMap::new();
        responses.insert(ApiEndpoint::BookmarkList, json!({ "characters": [] }));
        responses.insert(ApiEndpoint::FriendList, json!({ "friends": [] }));
        let connection = Self {
            character: character.to_string(),
            responses: Mutex::new(responses),
            gates: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
            started,
            sent: Mutex::new(Vec::new()),
        };
        (Arc::new(connection), started_rx)
    }

    pub fn respond(&self, endpoint: ApiEndpoint, body: Value) {
        self.responses.lock().unwrap().insert(endpoint, body);
    }

    pub fn set_friends(&self, edges: &[(&str, &str)]) {
        self.respond(ApiEndpoint::FriendList, friends_body(edges));
    }

    pub fn set_bookmarks(&self, names: &[&str]) {
        self.respond(ApiEndpoint::BookmarkList, json!({ "characters": names }));
    }

    /// Hold the next query to `endpoint` until the returned sender fires
    pub fn gate(&self, endpoint: ApiEndpoint) -> oneshot::Sender<Value> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn sent(&self) -> Vec<StatusCommand> {
        self.sent.lock().unwrap().clone()
    }
}

pub fn friends_body(edges: &[(&str, &str)]) -> Value {
    let friends: Vec<Value> = edges
        .iter()
        .map(|(source, dest)| json!({ "source": source, "dest": dest, "last_online": 0 }))
        .collect();
    json!({ "friends": friends })
}

#[async_trait]
impl Connection for ScriptedConnection {
    fn character(&self) -> &str {
        &self.character
    }

    async fn query_api(&self, endpoint: ApiEndpoint) -> Result<Value, ConnectionError> {
        let _ = self.started.send(endpoint);
        if *self.failing.lock().unwrap() {
            return Err(ConnectionError::Api {
                endpoint: endpoint.to_string(),
                message: "service unavailable".to_string(),
            });
        }

        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            return gate.await.map_err(|_| ConnectionError::Closed);
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&endpoint)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn send_status(&self, command: &StatusCommand) -> Result<(), ConnectionError> {
        self.sent.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Profile source serving fixed profiles, counting field loads
#[derive(Default)]
pub struct StaticProfiles {
    pub profiles: HashMap<String, Value>,
    pub field_loads: Mutex<u32>,
}

#[async_trait]
impl ProfileSource for StaticProfiles {
    async fn load_fields(&self) -> Result<(), ConnectionError> {
        *self.field_loads.lock().unwrap() += 1;
        Ok(())
    }

    async fn character_data(&self, name: &str) -> Result<CharacterProfile, ConnectionError> {
        let data = self.profiles.get(name).cloned().ok_or(ConnectionError::Api {
            endpoint: "character-data".to_string(),
            message: format!("unknown character {name}"),
        })?;
        Ok(CharacterProfile {
            name: name.to_string(),
            data,
        })
    }
}

pub fn roster(connection: Arc<ScriptedConnection>) -> Roster {
    Roster::new(
        connection,
        Arc::new(StaticProfiles::default()),
        Arc::new(NoOpRosterSink),
        RosterConfig::new().with_resolve_own_profile(false),
    )
}

pub fn online(name: &str) -> Inbound {
    ServerMessage::Online {
        identity: name.to_string(),
        gender: Gender::None,
        status: Status::Online,
    }
    .into()
}

pub fn offline(name: &str) -> Inbound {
    ServerMessage::Offline {
        character: name.to_string(),
    }
    .into()
}

pub fn status(name: &str, status: Status, text: &str) -> Inbound {
    ServerMessage::StatusUpdate {
        character: name.to_string(),
        status,
        statusmsg: text.to_string(),
    }
    .into()
}

pub fn relationship(kind: RelationshipKind, name: &str) -> Inbound {
    ServerMessage::Relationship(RelationshipChange {
        kind,
        name: name.to_string(),
    })
    .into()
}
