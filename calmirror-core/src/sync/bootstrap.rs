use tracing::{info, warn};

use crate::calendar::{Calendar, CalendarSet};
use crate::error::MirrorResult;
use crate::lock::RunLock;
use crate::provider::CalendarProvider;
use crate::store::KeyValueStore;
use crate::sync::Mirror;
use crate::sync::report::BootstrapReport;

impl<P, S, L> Mirror<P, S, L>
where
    P: CalendarProvider,
    S: KeyValueStore,
    L: RunLock,
{
    /// Wipe all state and every target calendar, then re-seed the targets
    /// from the recent events of the primary.
    pub async fn reset(&self) -> MirrorResult<BootstrapReport> {
        let _guard = self.lock.acquire(self.options.lock_timeout).await?;
        let calendars = self.calendars().await?;
        self.bootstrap(&calendars).await
    }

    /// Caller must hold the run lock.
    ///
    /// Cleanup and listing failures abort with the state already cleared,
    /// so the next run bootstraps again.
    pub(super) async fn bootstrap(&self, calendars: &CalendarSet) -> MirrorResult<BootstrapReport> {
        self.store.clear()?;
        let primary = calendars.primary()?;
        let mut report = BootstrapReport::default();

        for target in calendars.targets() {
            report.replicas_removed += self.purge(target).await?;
        }

        let horizon = (self.clock)() - self.options.retention;
        let replicator = self.replicator();
        let mut page_token: Option<String> = None;

        for _ in 0..self.options.max_pages {
            let page = self
                .provider
                .list_events_page(&primary.id, page_token.as_deref())
                .await?;

            for event in page.items {
                if event.is_cancelled() {
                    continue;
                }
                if event.start_utc().is_some_and(|start| start < horizon) {
                    report.skipped_expired += 1;
                    continue;
                }
                replicator
                    .replicate_to_all(&event, calendars.targets(), &mut report.seeded)
                    .await;
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => {
                    report.sync_token = page.next_sync_token;
                    break;
                }
            }
        }

        match &report.sync_token {
            Some(token) => self.store.record_sync_token(&primary.id, token)?,
            None => warn!(calendar = %primary.id, "bootstrap ended without a sync token"),
        }

        let counts = report.seeded.counts();
        info!(
            calendar = %primary.id,
            removed = report.replicas_removed,
            seeded = counts.created,
            failed = counts.failed,
            expired = report.skipped_expired,
            "bootstrap finished"
        );
        Ok(report)
    }

    /// Delete every event on `target`. Returns how many were deleted.
    async fn purge(&self, target: &Calendar) -> MirrorResult<usize> {
        let mut removed = 0;
        let mut page_token: Option<String> = None;

        for _ in 0..self.options.max_pages {
            let page = self
                .provider
                .list_events_page(&target.id, page_token.as_deref())
                .await?;

            for event in page.items.iter().filter(|e| !e.is_cancelled()) {
                self.provider.delete_event(&target.id, &event.id).await?;
                removed += 1;
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => return Ok(removed),
            }
        }

        warn!(calendar = %target.id, max_pages = self.options.max_pages, "page limit reached while purging");
        Ok(removed)
    }
}
