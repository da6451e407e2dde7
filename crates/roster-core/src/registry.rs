//! Canonical character registry
//!
//! One [`Character`] per case-insensitive name for the lifetime of the
//! process. Entries are created lazily on first reference and never removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::character::Character;
use crate::lists::NameLists;

/// Case-folded character name, the identity of a character
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterKey(String);

impl CharacterKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct CharacterRegistry {
    characters: BTreeMap<CharacterKey, Character>,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name`, creating the character on a miss.
    ///
    /// New characters take their relationship flags from the current lists,
    /// so a list that arrived before the first reference is still honored.
    pub fn get(&mut self, name: &str, lists: &NameLists) -> &mut Character {
        let key = CharacterKey::new(name);
        self.characters.entry(key).or_insert_with_key(|key| {
            let mut character = Character::new(name);
            character.is_friend = lists.is_friend(name);
            character.is_bookmarked = lists.is_bookmarked(name);
            character.is_chat_op = lists.is_op(name);
            character.is_ignored = lists.is_ignored(key.as_str());
            character.is_character_friend = lists.is_character_friend(name);
            tracing::trace!("Registered character {}", name);
            character
        })
    }

    /// Lookup without creating
    pub fn find(&self, key: &CharacterKey) -> Option<&Character> {
        self.characters.get(key)
    }

    pub fn find_mut(&mut self, key: &CharacterKey) -> Option<&mut Character> {
        self.characters.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CharacterKey, &Character)> {
        self.characters.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&CharacterKey, &mut Character)> {
        self.characters.iter_mut()
    }

    pub fn values(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.characters.len()
    }
}
