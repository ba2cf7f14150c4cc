//! Error types for calmirror.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while mirroring calendars.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Another sync run holds the lock (waited {0:?})")]
    LockBusy(Duration),

    #[error("No primary calendar reported by the provider")]
    NoPrimaryCalendar,

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Event {event_id} not found on calendar {calendar_id}")]
    EventNotFound {
        calendar_id: String,
        event_id: String,
    },

    #[error("Sync token for calendar {0} is no longer valid")]
    SyncTokenExpired(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MirrorError {
    fn from(e: serde_json::Error) -> Self {
        MirrorError::Serialization(e.to_string())
    }
}

/// Result type alias for calmirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;
