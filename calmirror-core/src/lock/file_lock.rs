//! Advisory file lock shared by every calmirror process of a user.

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use fs2::FileExt;
use tokio::time::{Instant, sleep};

use crate::error::{MirrorError, MirrorResult};
use crate::lock::{LockGuard, RunLock};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct FileLock {
    path: PathBuf,
}

/// Closing the file releases the `flock`.
struct HeldFile(File);

impl Drop for HeldFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLock { path: path.into() }
    }

    fn open(&self) -> MirrorResult<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(File::create(&self.path)?)
    }
}

#[async_trait]
impl RunLock for FileLock {
    async fn acquire(&self, wait: Duration) -> MirrorResult<LockGuard> {
        let file = self.open()?;
        let deadline = Instant::now() + wait;

        loop {
            if file.try_lock_exclusive().is_ok() {
                return Ok(LockGuard::new("file", HeldFile(file)));
            }
            if Instant::now() >= deadline {
                return Err(MirrorError::LockBusy(wait));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contention_between_handles_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        let first = FileLock::new(&path);
        let second = FileLock::new(&path);

        let held = first.acquire(Duration::from_millis(100)).await.unwrap();
        let contended = second.acquire(Duration::from_millis(120)).await;
        assert!(matches!(contended, Err(MirrorError::LockBusy(_))));

        drop(held);
        assert!(second.acquire(Duration::from_millis(100)).await.is_ok());
    }
}
