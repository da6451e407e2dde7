use std::path::Path;

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::error::{Result, RosterError};

/// Roster configuration
///
/// Loadable from a partial JSON file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RosterConfig {
    /// Capacity of the inbound event channel
    pub ingest_buffer: usize,

    /// Capacity of the broadcast channel behind `ChannelRosterSink`
    pub change_buffer: usize,

    /// Whether identity confirmation also resolves the own profile
    pub resolve_own_profile: bool,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            ingest_buffer: defaults::DEFAULT_INGEST_BUFFER,
            change_buffer: defaults::DEFAULT_CHANGE_BUFFER,
            resolve_own_profile: defaults::DEFAULT_RESOLVE_OWN_PROFILE,
        }
    }
}

impl RosterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| RosterError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingest_buffer == 0 {
            return Err(RosterError::Config("ingestBuffer must be at least 1".to_string()));
        }
        if self.change_buffer == 0 {
            return Err(RosterError::Config("changeBuffer must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_ingest_buffer(mut self, capacity: usize) -> Self {
        self.ingest_buffer = capacity;
        self
    }

    pub fn with_change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity;
        self
    }

    pub fn with_resolve_own_profile(mut self, enabled: bool) -> Self {
        self.resolve_own_profile = enabled;
        self
    }
}
