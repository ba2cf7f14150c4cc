//! In-process provider with real continuation-token semantics.
//!
//! Every mutation stamps the event with a global change sequence number.
//! A sync token is `<generation>:<sequence>`; the delta for a token is
//! every event of the calendar stamped after it, cancelled ones included.
//! [`MemoryProvider::expire_sync_tokens`] bumps the generation so all
//! previously issued tokens are rejected.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::calendar::CalendarEntry;
use crate::error::{MirrorError, MirrorResult};
use crate::event::{Event, EventStatus};
use crate::provider::{CalendarProvider, EventDelta, EventPage};

const DEFAULT_PAGE_SIZE: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
    Delete,
}

/// A mutating call received by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub kind: WriteKind,
    pub calendar_id: String,
    pub event_id: String,
}

struct StoredEvent {
    event: Event,
    changed: u64,
}

struct State {
    calendars: Vec<CalendarEntry>,
    events: HashMap<String, BTreeMap<String, StoredEvent>>,
    sequence: u64,
    generation: u64,
    page_size: usize,
    failing: HashSet<String>,
    failing_gets: HashSet<(String, String)>,
    writes: Vec<Write>,
}

impl State {
    fn token(&self) -> String {
        format!("{}:{}", self.generation, self.sequence)
    }

    fn check(&self, calendar_id: &str) -> MirrorResult<()> {
        if self.failing.contains(calendar_id) {
            return Err(MirrorError::Provider(format!(
                "Injected failure for calendar {calendar_id}"
            )));
        }
        if !self.events.contains_key(calendar_id) {
            return Err(MirrorError::CalendarNotFound(calendar_id.to_string()));
        }
        Ok(())
    }

    /// Insert or replace an event, stamping it with a new sequence number.
    fn store(&mut self, calendar_id: &str, event: Event) -> MirrorResult<Event> {
        self.sequence += 1;
        let changed = self.sequence;
        let calendar = self
            .events
            .get_mut(calendar_id)
            .ok_or_else(|| MirrorError::CalendarNotFound(calendar_id.to_string()))?;
        calendar.insert(
            event.id.clone(),
            StoredEvent {
                event: event.clone(),
                changed,
            },
        );
        Ok(event)
    }

    fn record(&mut self, kind: WriteKind, calendar_id: &str, event_id: &str) {
        self.writes.push(Write {
            kind,
            calendar_id: calendar_id.to_string(),
            event_id: event_id.to_string(),
        });
    }

    fn parse_token(&self, calendar_id: &str, token: &str) -> MirrorResult<u64> {
        let expired = || MirrorError::SyncTokenExpired(calendar_id.to_string());
        let (generation, sequence) = token.split_once(':').ok_or_else(expired)?;
        if generation.parse::<u64>().ok() != Some(self.generation) {
            return Err(expired());
        }
        sequence.parse().map_err(|_| expired())
    }
}

/// Calendar provider kept entirely in memory. Clones share state.
#[derive(Clone)]
pub struct MemoryProvider {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        MemoryProvider {
            state: Arc::new(Mutex::new(State {
                calendars: Vec::new(),
                events: HashMap::new(),
                sequence: 0,
                generation: 0,
                page_size: DEFAULT_PAGE_SIZE,
                failing: HashSet::new(),
                failing_gets: HashSet::new(),
                writes: Vec::new(),
            })),
        }
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = page_size.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_calendar(&self, id: &str, description: Option<&str>, primary: bool) {
        let mut state = self.state();
        state.calendars.push(CalendarEntry {
            id: id.to_string(),
            summary: Some(id.to_string()),
            description: description.map(String::from),
            primary,
        });
        state.events.entry(id.to_string()).or_default();
    }

    /// Insert or replace an event directly, without recording a write and
    /// regardless of injected failures. An empty id is replaced with a
    /// generated one.
    pub fn put_event(&self, calendar_id: &str, mut event: Event) -> MirrorResult<Event> {
        if event.id.is_empty() {
            event.id = uuid::Uuid::new_v4().to_string();
        }
        let mut state = self.state();
        if !state.events.contains_key(calendar_id) {
            return Err(MirrorError::CalendarNotFound(calendar_id.to_string()));
        }
        state.store(calendar_id, event)
    }

    /// Apply `edit` to a stored event, as a human editing it would.
    pub fn edit_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        edit: impl FnOnce(&mut Event),
    ) -> MirrorResult<Event> {
        let mut event = self
            .event(calendar_id, event_id)
            .ok_or_else(|| MirrorError::EventNotFound {
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
            })?;
        edit(&mut event);
        event.id = event_id.to_string();
        self.put_event(calendar_id, event)
    }

    pub fn cancel_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<Event> {
        self.edit_event(calendar_id, event_id, |e| e.status = EventStatus::Cancelled)
    }

    /// Stored event, cancelled or not.
    pub fn event(&self, calendar_id: &str, event_id: &str) -> Option<Event> {
        self.state()
            .events
            .get(calendar_id)?
            .get(event_id)
            .map(|s| s.event.clone())
    }

    /// Events of a calendar that are not cancelled.
    pub fn active_events(&self, calendar_id: &str) -> Vec<Event> {
        self.state()
            .events
            .get(calendar_id)
            .map(|events| {
                events
                    .values()
                    .filter(|s| !s.event.is_cancelled())
                    .map(|s| s.event.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make every call touching `calendar_id` fail until [`Self::recover_calendar`].
    pub fn fail_calendar(&self, calendar_id: &str) {
        self.state().failing.insert(calendar_id.to_string());
    }

    pub fn recover_calendar(&self, calendar_id: &str) {
        self.state().failing.remove(calendar_id);
    }

    /// Make fetching this one event fail while the rest of the calendar works.
    pub fn fail_get_event(&self, calendar_id: &str, event_id: &str) {
        self.state()
            .failing_gets
            .insert((calendar_id.to_string(), event_id.to_string()));
    }

    /// Invalidate every sync token issued so far.
    pub fn expire_sync_tokens(&self) {
        self.state().generation += 1;
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state().writes.clone()
    }

    pub fn writes_to(&self, calendar_id: &str, kind: WriteKind) -> usize {
        self.state()
            .writes
            .iter()
            .filter(|w| w.calendar_id == calendar_id && w.kind == kind)
            .count()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }
}

fn not_found(calendar_id: &str, event_id: &str) -> MirrorError {
    MirrorError::EventNotFound {
        calendar_id: calendar_id.to_string(),
        event_id: event_id.to_string(),
    }
}

#[async_trait]
impl CalendarProvider for MemoryProvider {
    async fn list_calendars(&self) -> MirrorResult<Vec<CalendarEntry>> {
        Ok(self.state().calendars.clone())
    }

    async fn list_events_delta(
        &self,
        calendar_id: &str,
        sync_token: &str,
    ) -> MirrorResult<EventDelta> {
        let state = self.state();
        state.check(calendar_id)?;
        let since = state.parse_token(calendar_id, sync_token)?;

        let mut changed: Vec<&StoredEvent> = state.events[calendar_id]
            .values()
            .filter(|s| s.changed > since)
            .collect();
        changed.sort_by_key(|s| s.changed);

        let items = changed
            .into_iter()
            .map(|s| {
                if s.event.is_cancelled() {
                    // Cancelled events come back stripped to id + status
                    Event {
                        id: s.event.id.clone(),
                        status: EventStatus::Cancelled,
                        ..Default::default()
                    }
                } else {
                    s.event.clone()
                }
            })
            .collect();

        Ok(EventDelta {
            items,
            next_sync_token: Some(state.token()),
        })
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> MirrorResult<EventPage> {
        let state = self.state();
        state.check(calendar_id)?;

        let mut remaining = state.events[calendar_id]
            .iter()
            .filter(|(id, s)| {
                !s.event.is_cancelled() && page_token.is_none_or(|t| id.as_str() > t)
            })
            .map(|(_, s)| s.event.clone());

        let items: Vec<Event> = remaining.by_ref().take(state.page_size).collect();
        let has_more = remaining.next().is_some();

        Ok(EventPage {
            next_page_token: if has_more {
                items.last().map(|e| e.id.clone())
            } else {
                None
            },
            next_sync_token: if has_more { None } else { Some(state.token()) },
            items,
        })
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<Event> {
        let state = self.state();
        state.check(calendar_id)?;
        if state
            .failing_gets
            .contains(&(calendar_id.to_string(), event_id.to_string()))
        {
            return Err(MirrorError::Provider(format!(
                "Injected failure fetching {event_id} from {calendar_id}"
            )));
        }
        state.events[calendar_id]
            .get(event_id)
            .map(|s| s.event.clone())
            .ok_or_else(|| not_found(calendar_id, event_id))
    }

    async fn create_event(&self, calendar_id: &str, event: &Event) -> MirrorResult<Event> {
        let mut state = self.state();
        state.check(calendar_id)?;

        let mut created = event.clone();
        created.id = uuid::Uuid::new_v4().to_string();
        let created = state.store(calendar_id, created)?;
        state.record(WriteKind::Create, calendar_id, &created.id);
        Ok(created)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> MirrorResult<Event> {
        let mut state = self.state();
        state.check(calendar_id)?;
        if !state.events[calendar_id].contains_key(event_id) {
            return Err(not_found(calendar_id, event_id));
        }

        let mut updated = event.clone();
        updated.id = event_id.to_string();
        let updated = state.store(calendar_id, updated)?;
        state.record(WriteKind::Update, calendar_id, event_id);
        Ok(updated)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<()> {
        let mut state = self.state();
        state.check(calendar_id)?;

        let mut event = match state.events[calendar_id].get(event_id) {
            Some(stored) if stored.event.is_cancelled() => {
                return Err(MirrorError::Provider(format!(
                    "Event {event_id} has already been deleted"
                )));
            }
            Some(stored) => stored.event.clone(),
            None => return Err(not_found(calendar_id, event_id)),
        };

        event.status = EventStatus::Cancelled;
        state.store(calendar_id, event)?;
        state.record(WriteKind::Delete, calendar_id, event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> Event {
        Event {
            summary: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_delta_returns_changes_after_token() {
        let provider = MemoryProvider::new();
        provider.add_calendar("me", None, true);
        let a = provider.put_event("me", titled("A")).unwrap();

        let page = provider.list_events_page("me", None).await.unwrap();
        let token = page.next_sync_token.unwrap();

        let b = provider.put_event("me", titled("B")).unwrap();
        provider.cancel_event("me", &a.id).unwrap();

        let delta = provider.list_events_delta("me", &token).await.unwrap();
        let ids: Vec<_> = delta.items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, [b.id.as_str(), a.id.as_str()]);

        let cancelled = &delta.items[1];
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.summary, None);

        let empty = provider
            .list_events_delta("me", &delta.next_sync_token.unwrap())
            .await
            .unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_expired_tokens_are_rejected() {
        let provider = MemoryProvider::new();
        provider.add_calendar("me", None, true);
        let token = provider
            .list_events_page("me", None)
            .await
            .unwrap()
            .next_sync_token
            .unwrap();

        provider.expire_sync_tokens();

        let err = provider.list_events_delta("me", &token).await.unwrap_err();
        assert!(matches!(err, MirrorError::SyncTokenExpired(_)));
    }

    #[tokio::test]
    async fn test_paging_survives_deleting_returned_items() {
        let provider = MemoryProvider::new().with_page_size(2);
        provider.add_calendar("t", Some("自動同期"), false);
        for i in 0..5 {
            provider.put_event("t", titled(&format!("E{i}"))).unwrap();
        }

        let mut page_token = None;
        let mut seen = 0;
        loop {
            let page = provider
                .list_events_page("t", page_token.as_deref())
                .await
                .unwrap();
            for event in &page.items {
                provider.delete_event("t", &event.id).await.unwrap();
                seen += 1;
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    assert!(page.next_sync_token.is_some());
                    break;
                }
            }
        }

        assert_eq!(seen, 5);
        assert!(provider.active_events("t").is_empty());
        assert_eq!(provider.writes_to("t", WriteKind::Delete), 5);
    }

    #[tokio::test]
    async fn test_failing_calendar_rejects_calls() {
        let provider = MemoryProvider::new();
        provider.add_calendar("t", None, false);
        provider.fail_calendar("t");

        assert!(provider.create_event("t", &titled("X")).await.is_err());

        provider.recover_calendar("t");
        assert!(provider.create_event("t", &titled("X")).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_get_only_affects_that_event() {
        let provider = MemoryProvider::new();
        provider.add_calendar("t", None, false);
        let broken = provider.put_event("t", titled("Broken")).unwrap();
        let fine = provider.put_event("t", titled("Fine")).unwrap();
        provider.fail_get_event("t", &broken.id);

        assert!(matches!(
            provider.get_event("t", &broken.id).await,
            Err(MirrorError::Provider(_))
        ));
        assert!(provider.get_event("t", &fine.id).await.is_ok());
        assert!(provider.list_events_page("t", None).await.is_ok());
    }
}
