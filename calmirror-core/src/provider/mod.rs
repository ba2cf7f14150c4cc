//! Calendar provider seam.
//!
//! The sync procedures only talk to a provider through [`CalendarProvider`].
//! [`SubprocessProvider`] forwards each call to an external
//! `calmirror-provider-<name>` binary; [`MemoryProvider`] keeps everything
//! in process.

mod memory;
pub mod protocol;
mod subprocess;

pub use memory::{MemoryProvider, Write, WriteKind};
pub use subprocess::SubprocessProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarEntry;
use crate::error::MirrorResult;
use crate::event::Event;

/// Events changed since a continuation token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventDelta {
    pub items: Vec<Event>,
    pub next_sync_token: Option<String>,
}

/// One page of a full event listing. `next_sync_token` is only set on
/// the last page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPage {
    pub items: Vec<Event>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_calendars(&self) -> MirrorResult<Vec<CalendarEntry>>;

    /// Changes since `sync_token`, including cancelled events.
    ///
    /// Fails with [`MirrorError::SyncTokenExpired`](crate::error::MirrorError::SyncTokenExpired)
    /// when the provider no longer honours the token.
    async fn list_events_delta(&self, calendar_id: &str, sync_token: &str)
    -> MirrorResult<EventDelta>;

    /// A page of the calendar's current (not cancelled) events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> MirrorResult<EventPage>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<Event>;

    async fn create_event(&self, calendar_id: &str, event: &Event) -> MirrorResult<Event>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> MirrorResult<Event>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<()>;
}
