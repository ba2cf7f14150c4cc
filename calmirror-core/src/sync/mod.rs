//! The mirroring procedures: incremental runs, replication and reset.

mod bootstrap;
mod replicator;
mod report;
mod runner;

pub use replicator::Replicator;
pub use report::{
    BootstrapReport, ReplicaAction, ReplicaCounts, ReplicationOutcome, RunOutcome, RunReport,
    SkipReason, SyncReport,
};

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::calendar::CalendarSet;
use crate::constants::{
    DEFAULT_ENROLLMENT_MARKER, DEFAULT_LOCK_TIMEOUT, DEFAULT_MAX_PAGES, DEFAULT_RETENTION_DAYS,
};
use crate::error::MirrorResult;
use crate::lock::RunLock;
use crate::provider::CalendarProvider;
use crate::store::{KeyValueStore, SyncStore};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Description prefix enrolling a calendar as a target.
    pub enrollment_marker: String,
    /// Primary events starting before `now - retention` are not re-seeded.
    pub retention: chrono::Duration,
    pub lock_timeout: Duration,
    /// Bound on pages walked per calendar during a reset.
    pub max_pages: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            enrollment_marker: DEFAULT_ENROLLMENT_MARKER.to_string(),
            retention: chrono::Duration::days(DEFAULT_RETENTION_DAYS),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Mirrors the primary calendar onto every enrolled target calendar.
pub struct Mirror<P, S, L> {
    provider: P,
    store: SyncStore<S>,
    lock: L,
    options: SyncOptions,
    clock: fn() -> DateTime<Utc>,
}

impl<P, S, L> Mirror<P, S, L>
where
    P: CalendarProvider,
    S: KeyValueStore,
    L: RunLock,
{
    pub fn new(provider: P, store: S, lock: L) -> Self {
        Mirror {
            provider,
            store: SyncStore::new(store),
            lock,
            options: SyncOptions::default(),
            clock: Utc::now,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the wall clock used for the retention horizon.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &SyncStore<S> {
        &self.store
    }

    /// List the provider's calendars and resolve their roles.
    pub async fn calendars(&self) -> MirrorResult<CalendarSet> {
        let entries = self.provider.list_calendars().await?;
        Ok(CalendarSet::resolve(entries, &self.options.enrollment_marker))
    }

    fn replicator(&self) -> Replicator<'_, P, S> {
        Replicator::new(&self.provider, &self.store)
    }
}
