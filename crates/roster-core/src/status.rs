//! Status transitions and derived presence views
//!
//! [`RosterState::set_status`] is the single place a character's status
//! changes while connected. It keeps the online friend, bookmark and
//! character-friend views in step with every transition.

use crate::character::{decode_html, Character, Gender, Status};
use crate::events::RosterList;
use crate::lists::{contains_name, same_name};
use crate::protocol::PresenceEntry;
use crate::registry::CharacterKey;
use crate::state::{Followup, RosterState};

/// Online subsets of the registry, in the order members came online
#[derive(Debug, Default, Clone)]
pub struct PresenceViews {
    pub friends: Vec<CharacterKey>,
    pub bookmarks: Vec<CharacterKey>,
    pub character_friends: Vec<CharacterKey>,
}

impl PresenceViews {
    pub fn clear(&mut self) -> bool {
        let had_members = !self.friends.is_empty()
            || !self.bookmarks.is_empty()
            || !self.character_friends.is_empty();
        self.friends.clear();
        self.bookmarks.clear();
        self.character_friends.clear();
        had_members
    }
}

/// Append `key` unless present. Returns whether the view changed.
pub(crate) fn push_unique(view: &mut Vec<CharacterKey>, key: &CharacterKey) -> bool {
    if view.contains(key) {
        return false;
    }
    view.push(key.clone());
    true
}

/// Remove `key` if present. Returns whether the view changed.
pub(crate) fn remove_key(view: &mut Vec<CharacterKey>, key: &CharacterKey) -> bool {
    match view.iter().position(|k| k == key) {
        Some(index) => {
            view.remove(index);
            true
        }
        None => false,
    }
}

impl RosterState {
    /// Apply a status change to a registered character.
    ///
    /// Coming online adds the character to each view whose flag is set;
    /// going offline removes it from all of them. `text` is HTML-decoded.
    /// A non-empty status text is kept as `previous_status_text` when it is
    /// replaced by another non-empty text or when the character goes
    /// offline; an empty replacement while online leaves it alone.
    pub fn set_status(&mut self, key: &CharacterKey, status: Status, text: &str) {
        let Some(c) = self.registry.find_mut(key) else {
            tracing::warn!("Status change for unregistered character {}", key);
            return;
        };

        let text = decode_html(text);
        let was_offline = c.status.is_offline();
        let mut views_changed = Vec::new();

        let previous = c.previous_status_text.clone();
        if !c.status_text.is_empty() && (!text.is_empty() || status.is_offline()) {
            c.previous_status_text = c.status_text.clone();
        }

        if was_offline && !status.is_offline() {
            if c.is_friend && push_unique(&mut self.views.friends, key) {
                views_changed.push(RosterList::Friends);
            }
            if c.is_bookmarked && push_unique(&mut self.views.bookmarks, key) {
                views_changed.push(RosterList::Bookmarks);
            }
            if contains_name(&self.lists.character_friends, &c.name) {
                c.is_character_friend = true;
                if push_unique(&mut self.views.character_friends, key) {
                    views_changed.push(RosterList::CharacterFriends);
                }
            }
        } else if !was_offline && status.is_offline() {
            if remove_key(&mut self.views.friends, key) {
                views_changed.push(RosterList::Friends);
            }
            if remove_key(&mut self.views.bookmarks, key) {
                views_changed.push(RosterList::Bookmarks);
            }
            if remove_key(&mut self.views.character_friends, key) {
                views_changed.push(RosterList::CharacterFriends);
            }
        }

        let changed = c.status != status
            || c.status_text != text
            || c.previous_status_text != previous
            || !views_changed.is_empty();
        c.status = status;
        c.status_text = text;
        let name = c.name.clone();

        if changed {
            self.record_character(&name);
        }
        for list in views_changed {
            self.record_list(list);
        }
    }

    /// Force every character offline with an empty status text and empty
    /// the presence views. Previous status texts are kept.
    pub(crate) fn reset_presence(&mut self) {
        let mut changed = Vec::new();
        for (_, c) in self.registry.iter_mut() {
            if !c.status.is_offline() || !c.status_text.is_empty() {
                c.status = Status::Offline;
                c.status_text.clear();
                changed.push(c.name.clone());
            }
        }
        for name in changed {
            self.record_character(&name);
        }
        if self.views.clear() {
            self.record_list(RosterList::Friends);
            self.record_list(RosterList::Bookmarks);
            self.record_list(RosterList::CharacterFriends);
        }
    }

    /// Re-derive the online friend and bookmark views from current flags
    /// and statuses. Members that stay keep their order.
    pub(crate) fn reconcile_presence_views(&mut self) {
        let mut changed = Vec::new();
        let registry = &self.registry;
        let views: [(&mut Vec<CharacterKey>, RosterList, fn(&Character) -> bool); 2] = [
            (&mut self.views.friends, RosterList::Friends, |c: &Character| c.is_friend),
            (
                &mut self.views.bookmarks,
                RosterList::Bookmarks,
                |c: &Character| c.is_bookmarked,
            ),
        ];
        for (view, list, flag) in views {
            let before = view.clone();
            view.retain(|k| registry.find(k).map_or(false, |c| flag(c) && c.is_online()));
            for (key, c) in registry.iter() {
                if flag(c) && c.is_online() {
                    push_unique(view, key);
                }
            }
            if *view != before {
                changed.push(list);
            }
        }
        for list in changed {
            self.record_list(list);
        }
    }

    /// Initial presence snapshot (`LIS`)
    pub fn apply_presence_batch(&mut self, entries: Vec<PresenceEntry>) {
        tracing::debug!("Applying presence batch of {} characters", entries.len());
        for PresenceEntry(name, gender, status, text) in entries {
            let key = CharacterKey::new(&name);
            let character = self.get(&name);
            if character.gender != gender {
                character.gender = gender;
                let name = character.name.clone();
                self.record_character(&name);
            }
            self.set_status(&key, status, &text);
        }
    }

    /// A character came online (`NLN`).
    ///
    /// When `identity` is the character this connection logged in as, our
    /// own identity is confirmed and the returned follow-up fetches the
    /// character-friend list and own profile.
    pub fn character_online(
        &mut self,
        identity: &str,
        gender: Gender,
        status: Status,
        own_identity: &str,
    ) -> Option<Followup> {
        let key = CharacterKey::new(identity);
        let character = self.get(identity);
        if character.name != identity || character.gender != gender {
            character.name = identity.to_string();
            character.gender = gender;
            self.record_character(identity);
        }
        self.set_status(&key, status, "");

        if same_name(identity, own_identity) {
            return Some(self.confirm_identity(key));
        }
        None
    }

    /// A character went offline (`FLN`)
    pub fn character_offline(&mut self, name: &str) {
        let key = CharacterKey::new(name);
        self.get(name);
        self.set_status(&key, Status::Offline, "");
    }

    /// Status message update (`STA`)
    pub fn status_update(&mut self, name: &str, status: Status, text: &str) {
        let key = CharacterKey::new(name);
        self.get(name);
        self.set_status(&key, status, text);
    }
}
