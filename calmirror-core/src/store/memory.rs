use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{MirrorError, MirrorResult};
use crate::store::KeyValueStore;

/// Process-local store. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MirrorResult<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| MirrorError::Store("Memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> MirrorResult<Option<Value>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> MirrorResult<()> {
        self.values()?.insert(key.to_string(), value);
        Ok(())
    }

    fn delete_all(&self) -> MirrorResult<()> {
        self.values()?.clear();
        Ok(())
    }
}
