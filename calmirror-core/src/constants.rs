//! Defaults shared by the config loader and the sync procedures.

use std::time::Duration;

/// Description prefix that enrolls a calendar as a replication target.
pub const DEFAULT_ENROLLMENT_MARKER: &str = "自動同期";

/// Primary events starting earlier than this many days ago are not re-seeded.
pub const DEFAULT_RETENTION_DAYS: i64 = 100;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound on pages walked while listing a calendar during a reset.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Store key holding calendar id -> continuation token.
pub const SYNC_TOKENS_KEY: &str = "nextSyncTokens";

/// Store key holding source event id -> target calendar id -> replica id.
pub const EVENT_ID_MAP_KEY: &str = "eventIdMap";
