//! Roster state aggregate
//!
//! [`RosterState`] is plain data plus synchronous mutation methods. The
//! methods are spread over the modules that own each concern:
//!
//! - `registry`: character lookup and creation
//! - `status`: presence transitions and the derived presence views
//! - `lists`: relationship list events
//! - `reconnect`: connecting/connected handling
//! - `overrides`: local display overrides
//!
//! Every mutation records [`RosterChange`]s, which the async
//! [`Roster`](crate::roster::Roster) handle drains and publishes.

use serde::Serialize;

use crate::character::Character;
use crate::connection::CharacterProfile;
use crate::events::{RosterChange, RosterList};
use crate::lists::{contains_name, FetchSequence, NameLists};
use crate::protocol::StatusCommand;
use crate::registry::{CharacterKey, CharacterRegistry};
use crate::status::PresenceViews;

/// Asynchronous tail of a handler, run after the synchronous part applied
///
/// Each carries the session epoch it was issued in so a result that
/// resolves after a newer `connecting` can be recognized and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    /// Fetch bookmark and friend lists, then reset every character
    Resync { epoch: u64 },
    /// Replay our own status after a reconnect
    ReplayStatus(StatusCommand),
    /// Re-fetch the friend list and rebuild the character-friend list
    RefreshCharacterFriends { epoch: u64, seq: u64 },
    /// Own identity confirmed: character friends, then own profile
    ConfirmIdentity {
        epoch: u64,
        seq: u64,
        own: CharacterKey,
    },
}

/// Roster aggregate.
///
/// Characters change only through inbound events and follow-up results;
/// outside code gets read-only lookups:
///
/// ```compile_fail
/// let mut state = roster_core::RosterState::new();
/// state.get("Bob").status = roster_core::Status::Online;
/// ```
#[derive(Debug, Default)]
pub struct RosterState {
    pub(crate) registry: CharacterRegistry,
    pub(crate) lists: NameLists,
    pub(crate) views: PresenceViews,
    pub(crate) own: Option<CharacterKey>,
    pub(crate) own_profile: Option<CharacterProfile>,
    pub(crate) reconnect_status: Option<StatusCommand>,
    pub(crate) epoch: u64,
    pub(crate) friend_fetches: FetchSequence,
    version: u64,
    changes: Vec<RosterChange>,
}

impl RosterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name`, creating it with flags taken from the current lists
    pub(crate) fn get(&mut self, name: &str) -> &mut Character {
        self.registry.get(name, &self.lists)
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.registry.find(&CharacterKey::new(name))
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.registry.values()
    }

    pub fn character_count(&self) -> usize {
        self.registry.len()
    }

    /// Online global friends, in the order they came online
    pub fn friends(&self) -> Vec<&Character> {
        self.resolve(&self.views.friends)
    }

    /// Online bookmarks, in the order they came online
    pub fn bookmarks(&self) -> Vec<&Character> {
        self.resolve(&self.views.bookmarks)
    }

    /// Online friends of our own character
    pub fn character_friends(&self) -> Vec<&Character> {
        self.resolve(&self.views.character_friends)
    }

    fn resolve<'a>(&'a self, keys: &[CharacterKey]) -> Vec<&'a Character> {
        keys.iter().filter_map(|k| self.registry.find(k)).collect()
    }

    fn names(&self, keys: &[CharacterKey]) -> Vec<String> {
        self.resolve(keys).into_iter().map(|c| c.name.clone()).collect()
    }

    pub fn own_character(&self) -> Option<&Character> {
        self.own.as_ref().and_then(|k| self.registry.find(k))
    }

    pub fn own_profile(&self) -> Option<&CharacterProfile> {
        self.own_profile.as_ref()
    }

    pub fn friend_list(&self) -> &[String] {
        &self.lists.friends
    }

    pub fn bookmark_list(&self) -> &[String] {
        &self.lists.bookmarks
    }

    pub fn ignore_list(&self) -> &[String] {
        &self.lists.ignore
    }

    pub fn op_list(&self) -> &[String] {
        &self.lists.ops
    }

    pub fn character_friend_list(&self) -> &[String] {
        &self.lists.character_friends
    }

    /// Number of mutation batches published so far
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn record(&mut self, change: RosterChange) {
        if !self.changes.contains(&change) {
            self.changes.push(change);
        }
    }

    pub(crate) fn record_character(&mut self, name: &str) {
        self.record(RosterChange::CharacterUpdated {
            name: name.to_string(),
        });
    }

    pub(crate) fn record_list(&mut self, list: RosterList) {
        self.record(RosterChange::ListChanged { list });
    }

    /// Drain pending changes. A non-empty batch bumps the version.
    pub fn take_changes(&mut self) -> (u64, Vec<RosterChange>) {
        let changes = std::mem::take(&mut self.changes);
        if !changes.is_empty() {
            self.version += 1;
        }
        (self.version, changes)
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            version: self.version,
            characters: self.registry.values().cloned().collect(),
            friends: self.names(&self.views.friends),
            bookmarks: self.names(&self.views.bookmarks),
            character_friends: self.names(&self.views.character_friends),
            own_character: self.own_character().map(|c| c.name.clone()),
            own_profile: self.own_profile.clone(),
            friend_list: self.lists.friends.clone(),
            bookmark_list: self.lists.bookmarks.clone(),
            ignore_list: self.lists.ignore.clone(),
            op_list: self.lists.ops.clone(),
            character_friend_list: self.lists.character_friends.clone(),
        }
    }

    /// Verify the list/flag/view invariants, describing the first violation
    pub fn check_consistency(&self) -> Result<(), String> {
        for (key, c) in self.registry.iter() {
            if key != &CharacterKey::new(&c.name) {
                return Err(format!("{} stored under key {}", c.name, key));
            }
            if c.is_friend != contains_name(&self.lists.friends, &c.name) {
                return Err(format!("{}: isFriend disagrees with friend list", c.name));
            }
            if c.is_bookmarked != contains_name(&self.lists.bookmarks, &c.name) {
                return Err(format!("{}: isBookmarked disagrees with bookmark list", c.name));
            }
            if c.is_ignored != self.lists.is_ignored(key.as_str()) {
                return Err(format!("{}: isIgnored disagrees with ignore list", c.name));
            }
            if c.is_chat_op != self.lists.is_op(&c.name) {
                return Err(format!("{}: isChatOp disagrees with op list", c.name));
            }
            if c.is_character_friend != contains_name(&self.lists.character_friends, &c.name) {
                return Err(format!(
                    "{}: isCharacterFriend disagrees with character friend list",
                    c.name
                ));
            }

            let checks = [
                ("friends", &self.views.friends, c.is_friend),
                ("bookmarks", &self.views.bookmarks, c.is_bookmarked),
                (
                    "characterFriends",
                    &self.views.character_friends,
                    c.is_character_friend,
                ),
            ];
            for (label, view, flag) in checks {
                let count = view.iter().filter(|k| *k == key).count();
                let expected = usize::from(flag && c.is_online());
                if count != expected {
                    return Err(format!(
                        "{}: appears {} times in {}, expected {}",
                        c.name, count, label, expected
                    ));
                }
            }
        }

        for view in [
            &self.views.friends,
            &self.views.bookmarks,
            &self.views.character_friends,
        ] {
            if let Some(key) = view.iter().find(|k| self.registry.find(k).is_none()) {
                return Err(format!("view references unknown character {key}"));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for name in &self.lists.ignore {
            if *name != name.to_lowercase() {
                return Err(format!("ignore list entry {name} is not lower-cased"));
            }
            if !seen.insert(name) {
                return Err(format!("ignore list entry {name} is duplicated"));
            }
        }
        Ok(())
    }
}

/// Serializable point-in-time copy of the roster
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSnapshot {
    pub version: u64,
    pub characters: Vec<Character>,
    pub friends: Vec<String>,
    pub bookmarks: Vec<String>,
    pub character_friends: Vec<String>,
    pub own_character: Option<String>,
    pub own_profile: Option<CharacterProfile>,
    pub friend_list: Vec<String>,
    pub bookmark_list: Vec<String>,
    pub ignore_list: Vec<String>,
    pub op_list: Vec<String>,
    pub character_friend_list: Vec<String>,
}
