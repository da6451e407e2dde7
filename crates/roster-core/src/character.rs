//! Character entity and the protocol enumerations it carries

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::overrides::Overrides;

/// Presence status as reported by the chat server
///
/// Unrecognized status strings degrade to [`Status::Online`]: the character
/// is present, only its substate is unknown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Status {
    #[default]
    Offline,
    Online,
    Away,
    Busy,
    Looking,
    Dnd,
    Idle,
    Crown,
}

impl Status {
    pub fn is_offline(self) -> bool {
        self == Status::Offline
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Offline => "offline",
            Status::Online => "online",
            Status::Away => "away",
            Status::Busy => "busy",
            Status::Looking => "looking",
            Status::Dnd => "dnd",
            Status::Idle => "idle",
            Status::Crown => "crown",
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "offline" => Status::Offline,
            "online" => Status::Online,
            "away" => Status::Away,
            "busy" => Status::Busy,
            "looking" => Status::Looking,
            "dnd" => Status::Dnd,
            "idle" => Status::Idle,
            "crown" => Status::Crown,
            other => {
                tracing::debug!("Unknown status '{}', treating as online", other);
                Status::Online
            }
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::from(value.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gender strings used by the chat protocol; unknown values map to `None`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String")]
pub enum Gender {
    #[default]
    None,
    Male,
    Female,
    Transgender,
    Herm,
    Shemale,
    #[serde(rename = "Male-Herm")]
    MaleHerm,
    #[serde(rename = "Cunt-boy")]
    Cuntboy,
}

impl From<&str> for Gender {
    fn from(value: &str) -> Self {
        match value {
            "Male" => Gender::Male,
            "Female" => Gender::Female,
            "Transgender" => Gender::Transgender,
            "Herm" => Gender::Herm,
            "Shemale" => Gender::Shemale,
            "Male-Herm" => Gender::MaleHerm,
            "Cunt-boy" => Gender::Cuntboy,
            _ => Gender::None,
        }
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        Gender::from(value.as_str())
    }
}

/// Fixed palette for the local name-color override
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CharacterColor {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Purple,
    Blue,
    Pink,
    Black,
    Brown,
    White,
    Gray,
    #[default]
    None,
}

impl CharacterColor {
    /// Case-insensitive palette lookup. Absent or unknown names give `None`.
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return CharacterColor::None;
        };
        match name.to_ascii_lowercase().as_str() {
            "red" => CharacterColor::Red,
            "orange" => CharacterColor::Orange,
            "yellow" => CharacterColor::Yellow,
            "green" => CharacterColor::Green,
            "cyan" => CharacterColor::Cyan,
            "purple" => CharacterColor::Purple,
            "blue" => CharacterColor::Blue,
            "pink" => CharacterColor::Pink,
            "black" => CharacterColor::Black,
            "brown" => CharacterColor::Brown,
            "white" => CharacterColor::White,
            "gray" => CharacterColor::Gray,
            _ => CharacterColor::None,
        }
    }
}

/// A character known to this client
///
/// Instances are owned by the [`CharacterRegistry`](crate::registry::CharacterRegistry).
/// `status` must only change through
/// [`RosterState::set_status`](crate::state::RosterState::set_status) or the
/// presence reset, otherwise the derived presence views drift.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    pub gender: Gender,
    pub status: Status,
    pub status_text: String,
    pub previous_status_text: String,
    pub is_friend: bool,
    pub is_bookmarked: bool,
    pub is_character_friend: bool,
    pub is_chat_op: bool,
    pub is_ignored: bool,
    pub overrides: Overrides,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gender: Gender::None,
            status: Status::Offline,
            status_text: String::new(),
            previous_status_text: String::new(),
            is_friend: false,
            is_bookmarked: false,
            is_character_friend: false,
            is_chat_op: false,
            is_ignored: false,
            overrides: Overrides::default(),
        }
    }

    pub fn is_online(&self) -> bool {
        !self.status.is_offline()
    }

    pub fn has_status_text_changed(&self) -> bool {
        self.previous_status_text != self.status_text
    }

    /// Gender to display: the local override if set, else the reported one
    pub fn effective_gender(&self) -> Gender {
        self.overrides.gender.unwrap_or(self.gender)
    }

    /// Status to display: the local override if set, else the reported one
    pub fn effective_status(&self) -> Status {
        self.overrides.status.unwrap_or(self.status)
    }
}

/// Decode the HTML entities the server escapes in status messages.
///
/// Unknown or malformed entities are left as-is.
pub fn decode_html(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}
