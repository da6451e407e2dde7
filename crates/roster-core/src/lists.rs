//! Relationship list synchronization
//!
//! The name lists (friends, bookmarks, ignore, ops, character friends) are
//! the source of truth for the per-character flags. Incremental events patch
//! them directly; the character-friend list is always rebuilt from a fresh
//! friend-list fetch instead of being patched, so a missed or reordered
//! event cannot leave it permanently wrong.

use serde::Serialize;

use crate::character::Character;
use crate::events::{RosterChange, RosterList};
use crate::protocol::{FriendEdge, IgnoreAction, RelationshipChange, RelationshipKind};
use crate::registry::CharacterKey;
use crate::state::{Followup, RosterState};
use crate::status::{push_unique, remove_key};

/// Case-insensitive name equality
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

pub(crate) fn contains_name(list: &[String], name: &str) -> bool {
    list.iter().any(|n| same_name(n, name))
}

/// Append unless already present. Returns whether the list changed.
pub(crate) fn insert_name(list: &mut Vec<String>, name: &str) -> bool {
    if contains_name(list, name) {
        return false;
    }
    list.push(name.to_string());
    true
}

/// Remove if present. Returns whether the list changed.
pub(crate) fn remove_name(list: &mut Vec<String>, name: &str) -> bool {
    match list.iter().position(|n| same_name(n, name)) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

fn dedup_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    for name in names {
        insert_name(&mut out, &name);
    }
    out
}

/// Canonical name lists
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameLists {
    pub friends: Vec<String>,
    pub bookmarks: Vec<String>,
    /// Always lower-cased and de-duplicated
    pub ignore: Vec<String>,
    pub ops: Vec<String>,
    /// Friends of our own character, from the last accepted fetch
    pub character_friends: Vec<String>,
}

impl NameLists {
    pub fn is_friend(&self, name: &str) -> bool {
        contains_name(&self.friends, name)
    }

    pub fn is_bookmarked(&self, name: &str) -> bool {
        contains_name(&self.bookmarks, name)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        contains_name(&self.ignore, name)
    }

    pub fn is_op(&self, name: &str) -> bool {
        contains_name(&self.ops, name)
    }

    pub fn is_character_friend(&self, name: &str) -> bool {
        contains_name(&self.character_friends, name)
    }
}

/// Orders character-friend fetches; an older result never overwrites a
/// newer one that already applied
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchSequence {
    issued: u64,
    applied: u64,
}

impl FetchSequence {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        true
    }
}

impl RosterState {
    pub fn apply_ignore(&mut self, action: IgnoreAction) {
        match action {
            IgnoreAction::Init { characters } => {
                self.lists.ignore = dedup_names(characters.iter().map(|c| c.to_lowercase()));
                self.record_list(RosterList::IgnoreList);
                self.rederive_moderation_flags();
            }
            IgnoreAction::Add { character } => {
                if insert_name(&mut self.lists.ignore, &character.to_lowercase()) {
                    self.record_list(RosterList::IgnoreList);
                }
                self.set_flag(&character, |c| &mut c.is_ignored, true);
            }
            IgnoreAction::Delete { character } => {
                if remove_name(&mut self.lists.ignore, &character) {
                    self.record_list(RosterList::IgnoreList);
                }
                self.set_flag(&character, |c| &mut c.is_ignored, false);
            }
        }
    }

    /// Full replacement of the chat-operator list
    pub fn set_op_list(&mut self, ops: Vec<String>) {
        self.lists.ops = dedup_names(ops);
        self.record_list(RosterList::OpList);
        self.rederive_moderation_flags();
    }

    pub fn add_op(&mut self, name: &str) {
        if insert_name(&mut self.lists.ops, name) {
            self.record_list(RosterList::OpList);
        }
        self.set_flag(name, |c| &mut c.is_chat_op, true);
    }

    pub fn remove_op(&mut self, name: &str) {
        if remove_name(&mut self.lists.ops, name) {
            self.record_list(RosterList::OpList);
        }
        self.set_flag(name, |c| &mut c.is_chat_op, false);
    }

    /// Re-derive `is_ignored` and `is_chat_op` for every known character
    pub(crate) fn rederive_moderation_flags(&mut self) {
        let mut changed = Vec::new();
        for (key, c) in self.registry.iter_mut() {
            let ignored = self.lists.is_ignored(key.as_str());
            let op = self.lists.is_op(&c.name);
            if c.is_ignored != ignored || c.is_chat_op != op {
                c.is_ignored = ignored;
                c.is_chat_op = op;
                changed.push(c.name.clone());
            }
        }
        for name in changed {
            self.record_character(&name);
        }
    }

    fn set_flag(
        &mut self,
        name: &str,
        flag: impl FnOnce(&mut Character) -> &mut bool,
        value: bool,
    ) {
        let character = self.get(name);
        let slot = flag(&mut *character);
        if *slot == value {
            return;
        }
        *slot = value;
        let name = character.name.clone();
        self.record_character(&name);
    }

    /// Bookmark and friend changes (`RTB`)
    ///
    /// Friend changes also return a refresh of the character-friend list.
    pub fn apply_relationship(&mut self, change: RelationshipChange) -> Option<Followup> {
        let RelationshipChange { kind, name } = change;
        if let RelationshipKind::Other(other) = &kind {
            tracing::trace!("Ignoring relationship event '{}'", other);
            return None;
        }
        if name.is_empty() {
            tracing::warn!("Relationship event {:?} without a name", kind);
            return None;
        }

        let key = CharacterKey::new(&name);
        match kind {
            RelationshipKind::BookmarkAdd => {
                if insert_name(&mut self.lists.bookmarks, &name) {
                    self.record_list(RosterList::BookmarkList);
                }
                self.set_flag(&name, |c| &mut c.is_bookmarked, true);
                if self.get(&name).is_online() && push_unique(&mut self.views.bookmarks, &key) {
                    self.record_list(RosterList::Bookmarks);
                }
                None
            }
            RelationshipKind::BookmarkRemove => {
                if remove_name(&mut self.lists.bookmarks, &name) {
                    self.record_list(RosterList::BookmarkList);
                }
                self.set_flag(&name, |c| &mut c.is_bookmarked, false);
                if remove_key(&mut self.views.bookmarks, &key) {
                    self.record_list(RosterList::Bookmarks);
                }
                None
            }
            RelationshipKind::FriendAdd => {
                if insert_name(&mut self.lists.friends, &name) {
                    self.record_list(RosterList::FriendList);
                }
                self.set_flag(&name, |c| &mut c.is_friend, true);
                if self.get(&name).is_online() && push_unique(&mut self.views.friends, &key) {
                    self.record_list(RosterList::Friends);
                }
                Some(self.character_friend_refresh())
            }
            RelationshipKind::FriendRemove => {
                if remove_name(&mut self.lists.friends, &name) {
                    self.record_list(RosterList::FriendList);
                }
                self.set_flag(&name, |c| &mut c.is_friend, false);
                if remove_key(&mut self.views.friends, &key) {
                    self.record_list(RosterList::Friends);
                }
                Some(self.character_friend_refresh())
            }
            RelationshipKind::Other(_) => None,
        }
    }

    fn character_friend_refresh(&mut self) -> Followup {
        Followup::RefreshCharacterFriends {
            epoch: self.epoch,
            seq: self.friend_fetches.issue(),
        }
    }

    /// The server confirmed which character is ours
    pub(crate) fn confirm_identity(&mut self, own: CharacterKey) -> Followup {
        let name = self.get(own.as_str()).name.clone();
        if self.own.as_ref() != Some(&own) {
            tracing::info!("Own character confirmed: {}", name);
            self.own = Some(own.clone());
            self.record(RosterChange::OwnCharacterChanged { name });
        }
        Followup::ConfirmIdentity {
            epoch: self.epoch,
            seq: self.friend_fetches.issue(),
            own,
        }
    }

    /// Whether `own` is still our character in session `epoch`
    pub fn is_current_identity(&self, epoch: u64, own: &CharacterKey) -> bool {
        self.epoch == epoch && self.own.as_ref() == Some(own)
    }

    /// Apply a friend-list fetch issued in `epoch` as fetch number `seq`.
    ///
    /// Rebuilds the character-friend list from edges whose source is our
    /// current own character (empty if none is known yet) and reconciles
    /// flags and the online view against current statuses. Returns false
    /// when the result is stale and was dropped.
    pub fn apply_character_friend_edges(
        &mut self,
        epoch: u64,
        seq: u64,
        expected_own: Option<&CharacterKey>,
        edges: &[FriendEdge],
    ) -> bool {
        if epoch != self.epoch {
            tracing::warn!(
                "Discarding friend list fetched in session {} (now {})",
                epoch,
                self.epoch
            );
            return false;
        }
        if let Some(expected) = expected_own {
            if self.own.as_ref() != Some(expected) {
                tracing::warn!("Discarding friend list fetched for previous own character {}", expected);
                return false;
            }
        }
        if !self.friend_fetches.accept(seq) {
            tracing::warn!("Discarding out-of-order friend list fetch #{}", seq);
            return false;
        }

        let list = match self.own_character().map(|c| c.name.clone()) {
            Some(own) => dedup_names(
                edges
                    .iter()
                    .filter(|e| same_name(&e.source, &own))
                    .map(|e| e.dest.clone()),
            ),
            None => Vec::new(),
        };
        if list != self.lists.character_friends {
            self.lists.character_friends = list;
            self.record_list(RosterList::CharacterFriendList);
        }
        self.reconcile_character_friends();
        true
    }

    /// Bring `is_character_friend` and the online character-friend view in
    /// line with the character-friend list and current statuses
    pub(crate) fn reconcile_character_friends(&mut self) {
        let mut changed = Vec::new();
        for (_, c) in self.registry.iter_mut() {
            let qualifies = contains_name(&self.lists.character_friends, &c.name);
            if c.is_character_friend != qualifies {
                c.is_character_friend = qualifies;
                changed.push(c.name.clone());
            }
        }

        let registry = &self.registry;
        let before = self.views.character_friends.len();
        self.views.character_friends.retain(|k| {
            registry
                .find(k)
                .map_or(false, |c| c.is_character_friend && c.is_online())
        });
        let mut view_changed = before != self.views.character_friends.len();

        for (key, c) in self.registry.iter() {
            if c.is_character_friend && c.is_online() {
                view_changed |= push_unique(&mut self.views.character_friends, key);
            }
        }

        for name in changed {
            self.record_character(&name);
        }
        if view_changed {
            self.record_list(RosterList::CharacterFriends);
        }
    }

    /// Store the own profile if `own` is still our character
    pub fn set_own_profile(
        &mut self,
        own: &CharacterKey,
        profile: crate::connection::CharacterProfile,
    ) -> bool {
        if self.own.as_ref() != Some(own) {
            tracing::warn!("Discarding profile for previous own character {}", own);
            return false;
        }
        tracing::info!("Own profile resolved for {}", profile.name);
        let name = profile.name.clone();
        self.own_profile = Some(profile);
        self.record(RosterChange::OwnProfileResolved { name });
        true
    }
}
