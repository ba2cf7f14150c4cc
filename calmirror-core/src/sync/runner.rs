use tracing::{debug, info, warn};

use crate::calendar::CalendarSet;
use crate::error::{MirrorError, MirrorResult};
use crate::lock::RunLock;
use crate::provider::CalendarProvider;
use crate::store::KeyValueStore;
use crate::sync::Mirror;
use crate::sync::report::{RunOutcome, RunReport};

impl<P, S, L> Mirror<P, S, L>
where
    P: CalendarProvider,
    S: KeyValueStore,
    L: RunLock,
{
    /// Run one incremental sync on behalf of `calendar_id`.
    ///
    /// Only the primary calendar drives replication; any other id is a
    /// no-op. The run lock is held until the new continuation token is
    /// persisted.
    pub async fn run(&self, calendar_id: &str) -> MirrorResult<RunOutcome> {
        let _guard = self.lock.acquire(self.options.lock_timeout).await?;

        let calendars = self.calendars().await?;
        let primary = calendars.primary()?;
        if primary.id != calendar_id {
            debug!(calendar = %calendar_id, primary = %primary.id, "not the primary calendar, nothing to do");
            return Ok(RunOutcome::NotPrimary {
                primary_id: primary.id.clone(),
            });
        }

        self.sync_primary(&calendars).await.map(RunOutcome::Synced)
    }

    /// Run one incremental sync on the primary calendar, whatever its id.
    pub async fn run_primary(&self) -> MirrorResult<RunReport> {
        let _guard = self.lock.acquire(self.options.lock_timeout).await?;
        let calendars = self.calendars().await?;
        self.sync_primary(&calendars).await
    }

    async fn sync_primary(&self, calendars: &CalendarSet) -> MirrorResult<RunReport> {
        let primary = calendars.primary()?;
        let mut report = RunReport {
            calendar_id: primary.id.clone(),
            ..Default::default()
        };

        let token = match self.store.sync_token(&primary.id)? {
            Some(token) => token,
            None => {
                info!(calendar = %primary.id, "no sync token, bootstrapping");
                let bootstrap = self.bootstrap(calendars).await?;
                let token = bootstrap.sync_token.clone();
                report.bootstrap = Some(bootstrap);
                match token {
                    Some(token) => token,
                    None => return Ok(report),
                }
            }
        };

        let delta = match self.provider.list_events_delta(&primary.id, &token).await {
            Err(MirrorError::SyncTokenExpired(_)) => {
                warn!(calendar = %primary.id, "sync token expired, bootstrapping");
                let bootstrap = self.bootstrap(calendars).await?;
                let fresh = bootstrap.sync_token.clone();
                report.bootstrap = Some(bootstrap);
                let Some(fresh) = fresh else {
                    return Ok(report);
                };
                self.provider.list_events_delta(&primary.id, &fresh).await?
            }
            delta => delta?,
        };

        debug!(calendar = %primary.id, changed = delta.items.len(), "fetched delta");
        report.changed_events = delta.items.len();

        let replicator = self.replicator();
        for item in delta.items {
            let event = if item.is_cancelled() {
                match self.provider.get_event(&primary.id, &item.id).await {
                    Ok(full) => full,
                    Err(e) => {
                        warn!(calendar = %primary.id, event = %item.id, error = %e, "could not re-fetch cancelled event");
                        item
                    }
                }
            } else {
                item
            };

            replicator
                .replicate_to_all(&event, calendars.targets(), &mut report.changes)
                .await;
        }

        if let Some(next) = delta.next_sync_token {
            self.store.record_sync_token(&primary.id, &next)?;
            report.sync_token = Some(next);
        }

        Ok(report)
    }
}
