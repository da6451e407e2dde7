/// Default capacity of the inbound event channel
pub const DEFAULT_INGEST_BUFFER: usize = 256;

/// Default capacity of the broadcast change channel
pub const DEFAULT_CHANGE_BUFFER: usize = 1024;

/// Fetch our own profile once the server confirms our identity
pub const DEFAULT_RESOLVE_OWN_PROFILE: bool = true;

/// Directory under the platform config dir holding `config.json`
pub const CONFIG_DIR_NAME: &str = "roster";

pub const CONFIG_FILE_NAME: &str = "config.json";
