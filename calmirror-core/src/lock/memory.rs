use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{MirrorError, MirrorResult};
use crate::lock::{LockGuard, RunLock};

/// In-process lock. Clones contend for the same mutex.
#[derive(Clone, Default)]
pub struct MemoryLock {
    mutex: Arc<Mutex<()>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunLock for MemoryLock {
    async fn acquire(&self, wait: Duration) -> MirrorResult<LockGuard> {
        let guard = timeout(wait, self.mutex.clone().lock_owned())
            .await
            .map_err(|_| MirrorError::LockBusy(wait))?;
        Ok(LockGuard::new("memory", guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_times_out_while_held() {
        let lock = MemoryLock::new();
        let _held = lock.acquire(Duration::from_millis(10)).await.unwrap();

        let second = lock.clone().acquire(Duration::from_millis(20)).await;
        assert!(matches!(second, Err(MirrorError::LockBusy(_))));
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let lock = MemoryLock::new();
        drop(lock.acquire(Duration::from_millis(10)).await.unwrap());

        assert!(lock.acquire(Duration::from_millis(10)).await.is_ok());
    }
}
