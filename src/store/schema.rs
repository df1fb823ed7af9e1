//! Storage schema

/// Version written alongside every saved session document
pub const SCHEMA_VERSION: i64 = 1;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    language TEXT NOT NULL,
    document TEXT NOT NULL,
    schema_version INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS device (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Key of the per-device identifier row in `device`
pub const DEVICE_ID_KEY: &str = "device_id";
