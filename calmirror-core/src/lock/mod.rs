//! Mutual exclusion between sync runs.
//!
//! A run holds the lock from calendar listing until the new continuation
//! token is persisted. Acquisition waits a bounded time and then fails with
//! [`MirrorError::LockBusy`](crate::error::MirrorError::LockBusy); the
//! scheduler retries on its next tick.

mod file_lock;
mod memory;

pub use file_lock::FileLock;
pub use memory::MemoryLock;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::MirrorResult;

#[async_trait]
pub trait RunLock: Send + Sync {
    /// Wait at most `wait` for exclusive access.
    async fn acquire(&self, wait: Duration) -> MirrorResult<LockGuard>;
}

/// Held for the duration of a run. Dropping it releases the lock.
pub struct LockGuard {
    name: &'static str,
    _held: Box<dyn Send + Sync>,
}

impl LockGuard {
    fn new(name: &'static str, held: impl Send + Sync + 'static) -> Self {
        debug!(lock = name, "lock acquired");
        LockGuard {
            name,
            _held: Box::new(held),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!(lock = self.name, "lock released");
    }
}
