//! Single-document JSON store on disk.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{MirrorError, MirrorResult};
use crate::store::KeyValueStore;

const STATE_FILE: &str = "state.json";

/// Stores every key as a field of one JSON object in `<dir>/state.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> MirrorResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(JsonFileStore { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn load(&self) -> MirrorResult<Map<String, Value>> {
        let path = self.path();
        if !path.exists() {
            return Ok(Map::new());
        }

        let contents = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(MirrorError::Store(format!(
                "{} does not contain a JSON object",
                path.display()
            ))),
            Err(e) => Err(MirrorError::Store(format!(
                "Failed to parse {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Atomic write via temp file + rename
    fn save(&self, values: &Map<String, Value>) -> MirrorResult<()> {
        let path = self.path();
        let temp = self.dir.join(format!("{STATE_FILE}.tmp"));

        let contents = serde_json::to_string_pretty(values)?;
        std::fs::write(&temp, contents)?;
        std::fs::rename(&temp, &path)?;

        debug!(path = %path.display(), "state saved");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> MirrorResult<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> MirrorResult<()> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value);
        self.save(&values)
    }

    fn delete_all(&self) -> MirrorResult<()> {
        remove_if_exists(&self.path())
    }
}

fn remove_if_exists(path: &Path) -> MirrorResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SyncStore;
    use serde_json::json;

    #[test]
    fn test_values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();

        let store = SyncStore::new(JsonFileStore::open(dir.path()).unwrap());
        store.record_sync_token("primary", "tok-1").unwrap();
        store.record_replica("evt", "target", "rep").unwrap();
        drop(store);

        let reopened = SyncStore::new(JsonFileStore::open(dir.path()).unwrap());
        assert_eq!(reopened.sync_token("primary").unwrap().as_deref(), Some("tok-1"));
        assert_eq!(
            reopened.replica_id("evt", "target").unwrap().as_deref(),
            Some("rep")
        );
    }

    #[test]
    fn test_delete_all_removes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("k", json!({ "a": 1 })).unwrap();
        assert!(store.path().exists());

        store.delete_all().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get("k").unwrap(), None);

        // Clearing an already empty store is fine
        store.delete_all().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.get("k"), Err(MirrorError::Store(_))));
    }
}
