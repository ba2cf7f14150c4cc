//! Persistence of continuation tokens and the replica identity map.
//!
//! The raw [`KeyValueStore`] only knows JSON values under string keys.
//! [`SyncStore`] layers the typed, merge-only view the sync procedures use
//! on top of it: every write reads the current object under a key and
//! shallow-merges the patch into it, so entries written by someone else
//! are never dropped.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::constants::{EVENT_ID_MAP_KEY, SYNC_TOKENS_KEY};
use crate::error::{MirrorError, MirrorResult};

/// calendar id -> continuation token
pub type SyncTokens = BTreeMap<String, String>;

/// source event id -> target calendar id -> replica event id
pub type EventIdMap = BTreeMap<String, BTreeMap<String, String>>;

/// Durable associative storage keyed by logical name.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> MirrorResult<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> MirrorResult<()>;
    fn delete_all(&self) -> MirrorResult<()>;
}

/// Typed view over a [`KeyValueStore`].
pub struct SyncStore<S> {
    inner: S,
}

/// Counts shown by `calmirror status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSummary {
    pub sync_tokens: SyncTokens,
    pub mapped_events: usize,
    pub replicas: usize,
}

impl<S: KeyValueStore> SyncStore<S> {
    pub fn new(inner: S) -> Self {
        SyncStore { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> MirrorResult<T> {
        match self.inner.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| MirrorError::Store(format!("Malformed value under '{key}': {e}"))),
            None => Ok(T::default()),
        }
    }

    /// `{...current, ...patch}` at the top level of `key`.
    fn merge(&self, key: &str, patch: Map<String, Value>) -> MirrorResult<()> {
        let mut current = match self.inner.get(key)? {
            Some(Value::Object(map)) => map,
            Some(_) | None => Map::new(),
        };
        current.extend(patch);
        self.inner.set(key, Value::Object(current))
    }

    pub fn sync_tokens(&self) -> MirrorResult<SyncTokens> {
        self.read(SYNC_TOKENS_KEY)
    }

    pub fn sync_token(&self, calendar_id: &str) -> MirrorResult<Option<String>> {
        Ok(self.sync_tokens()?.remove(calendar_id))
    }

    pub fn record_sync_token(&self, calendar_id: &str, token: &str) -> MirrorResult<()> {
        let mut patch = Map::new();
        patch.insert(calendar_id.to_string(), Value::String(token.to_string()));
        self.merge(SYNC_TOKENS_KEY, patch)
    }

    pub fn event_id_map(&self) -> MirrorResult<EventIdMap> {
        self.read(EVENT_ID_MAP_KEY)
    }

    /// Replica ids of one source event, by target calendar id.
    pub fn replicas_of(&self, source_event_id: &str) -> MirrorResult<BTreeMap<String, String>> {
        Ok(self
            .event_id_map()?
            .remove(source_event_id)
            .unwrap_or_default())
    }

    pub fn replica_id(
        &self,
        source_event_id: &str,
        target_calendar_id: &str,
    ) -> MirrorResult<Option<String>> {
        Ok(self
            .replicas_of(source_event_id)?
            .remove(target_calendar_id))
    }

    /// Add one `(source, target) -> replica` entry, keeping the source's
    /// existing replicas on other targets.
    pub fn record_replica(
        &self,
        source_event_id: &str,
        target_calendar_id: &str,
        replica_id: &str,
    ) -> MirrorResult<()> {
        let mut targets = self.replicas_of(source_event_id)?;
        targets.insert(target_calendar_id.to_string(), replica_id.to_string());

        let mut patch = Map::new();
        patch.insert(source_event_id.to_string(), serde_json::to_value(targets)?);
        self.merge(EVENT_ID_MAP_KEY, patch)
    }

    /// Drop every token and mapping.
    pub fn clear(&self) -> MirrorResult<()> {
        self.inner.delete_all()
    }

    pub fn summary(&self) -> MirrorResult<StoreSummary> {
        let map = self.event_id_map()?;
        Ok(StoreSummary {
            sync_tokens: self.sync_tokens()?,
            mapped_events: map.len(),
            replicas: map.values().map(BTreeMap::len).sum(),
        })
    }
}
