//! Local display overrides
//!
//! Overrides are client-side values that supersede what the server reports
//! for a character. They are never sent to the server and are independent of
//! protocol-driven fields, so a presence resync leaves them alone.

use serde::{Deserialize, Serialize};

use crate::character::{CharacterColor, Gender, Status};
use crate::events::RosterChange;
use crate::registry::CharacterKey;
use crate::state::RosterState;

/// Which override a value belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OverrideKind {
    AvatarUrl,
    CharacterColor,
    Gender,
    Status,
}

/// Raw override input as supplied by callers (settings UI, slash commands)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideInput {
    AvatarUrl(Option<String>),
    /// Color name, matched case-insensitively against the palette
    CharacterColor(Option<String>),
    Gender(Option<Gender>),
    Status(Option<Status>),
}

/// Normalized override value, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideValue {
    AvatarUrl(Option<String>),
    CharacterColor(CharacterColor),
    Gender(Option<Gender>),
    Status(Option<Status>),
}

impl OverrideInput {
    pub fn kind(&self) -> OverrideKind {
        match self {
            OverrideInput::AvatarUrl(_) => OverrideKind::AvatarUrl,
            OverrideInput::CharacterColor(_) => OverrideKind::CharacterColor,
            OverrideInput::Gender(_) => OverrideKind::Gender,
            OverrideInput::Status(_) => OverrideKind::Status,
        }
    }

    pub fn resolve(self) -> OverrideValue {
        match self {
            OverrideInput::AvatarUrl(url) => OverrideValue::AvatarUrl(url),
            OverrideInput::CharacterColor(name) => {
                OverrideValue::CharacterColor(CharacterColor::from_name(name.as_deref()))
            }
            OverrideInput::Gender(gender) => OverrideValue::Gender(gender),
            OverrideInput::Status(status) => OverrideValue::Status(status),
        }
    }
}

/// Sparse set of overrides for one character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_color: Option<CharacterColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Overrides {
    /// Store `value`. Returns false, leaving everything untouched, when the
    /// stored value is already equal.
    pub fn apply(&mut self, value: OverrideValue) -> bool {
        match value {
            OverrideValue::AvatarUrl(url) => replace_if_changed(&mut self.avatar_url, url),
            OverrideValue::CharacterColor(color) => {
                replace_if_changed(&mut self.character_color, Some(color))
            }
            OverrideValue::Gender(gender) => replace_if_changed(&mut self.gender, gender),
            OverrideValue::Status(status) => replace_if_changed(&mut self.status, status),
        }
    }

    pub fn color(&self) -> CharacterColor {
        self.character_color.unwrap_or_default()
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

impl RosterState {
    /// Set a local override on `name`, creating the character if unknown.
    ///
    /// Returns whether anything changed; an unchanged value records no
    /// change notification.
    pub fn set_override(&mut self, name: &str, input: OverrideInput) -> bool {
        let kind = input.kind();
        let character = self.get(name);
        if !character.overrides.apply(input.resolve()) {
            return false;
        }
        let name = character.name.clone();
        tracing::debug!("Override {:?} changed for {}", kind, name);
        self.record(RosterChange::OverrideChanged { name, kind });
        true
    }

    pub fn overrides(&self, name: &str) -> Option<&Overrides> {
        self.registry
            .find(&CharacterKey::new(name))
            .map(|c| &c.overrides)
    }
}
