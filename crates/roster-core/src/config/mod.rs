//! Roster configuration
//!
//! - `roster_config`: configuration structure and file loading
//! - `defaults`: default configuration values

pub mod defaults;
pub mod roster_config;

pub use roster_config::RosterConfig;
