pub mod calendars;
pub mod reset;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use calmirror_core::lock::FileLock;
use calmirror_core::provider::SubprocessProvider;
use calmirror_core::store::JsonFileStore;
use calmirror_core::{Mirror, MirrorConfig};

/// Lock file shared by every calmirror process using the same state dir.
const LOCK_FILE: &str = "run.lock";

pub type CliMirror = Mirror<SubprocessProvider, JsonFileStore, FileLock>;

pub fn open_store(config: &MirrorConfig) -> Result<JsonFileStore> {
    let state_dir = config.state_path()?;
    JsonFileStore::open(&state_dir)
        .with_context(|| format!("Could not open state directory {}", state_dir.display()))
}

pub fn open_mirror(config: &MirrorConfig) -> Result<CliMirror> {
    let provider = SubprocessProvider::new(&config.provider, config.provider_config.clone());
    let store = open_store(config)?;
    let lock = FileLock::new(config.state_path()?.join(LOCK_FILE));

    Ok(Mirror::new(provider, store, lock).with_options(config.sync_options()?))
}
