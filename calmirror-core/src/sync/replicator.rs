//! Applies one source event to one target calendar.

use tracing::{debug, info, warn};

use crate::calendar::Calendar;
use crate::error::{MirrorError, MirrorResult};
use crate::event::Event;
use crate::projection::{CREATE_FIELDS, UPDATE_FIELDS, project};
use crate::provider::CalendarProvider;
use crate::store::{KeyValueStore, SyncStore};
use crate::sync::report::{ReplicaAction, ReplicationOutcome, SkipReason, SyncReport};

pub struct Replicator<'a, P: ?Sized, S> {
    provider: &'a P,
    store: &'a SyncStore<S>,
}

impl<'a, P, S> Replicator<'a, P, S>
where
    P: CalendarProvider + ?Sized,
    S: KeyValueStore,
{
    pub fn new(provider: &'a P, store: &'a SyncStore<S>) -> Self {
        Replicator { provider, store }
    }

    /// Create, update or delete the replica of `source` on `target`.
    ///
    /// Provider and store failures are returned as-is; isolating them is
    /// the caller's job.
    pub async fn replicate(&self, source: &Event, target: &Calendar) -> MirrorResult<ReplicaAction> {
        if !target.accepts_replicas() {
            debug!(calendar = %target.id, "target not enrolled, skipping");
            return Ok(ReplicaAction::Skipped(SkipReason::NotEnrolled));
        }

        let replica_id = self.store.replica_id(&source.id, &target.id)?;

        if source.is_cancelled() {
            return match replica_id {
                Some(replica_id) => self.delete(target, replica_id).await,
                None => Ok(ReplicaAction::Skipped(SkipReason::NothingToDelete)),
            };
        }

        match replica_id {
            Some(replica_id) => {
                let replica = self.provider.get_event(&target.id, &replica_id).await?;
                let merged = project(&replica, source, UPDATE_FIELDS);
                self.provider
                    .update_event(&target.id, &replica_id, &merged)
                    .await?;

                info!(calendar = %target.id, event = %source.id, replica = %replica_id, "updated replica");
                Ok(ReplicaAction::Updated { replica_id })
            }
            None => {
                let payload = project(&Event::default(), source, CREATE_FIELDS);
                let created = self.provider.create_event(&target.id, &payload).await?;
                self.store
                    .record_replica(&source.id, &target.id, &created.id)?;

                info!(calendar = %target.id, event = %source.id, replica = %created.id, "created replica");
                Ok(ReplicaAction::Created {
                    replica_id: created.id,
                })
            }
        }
    }

    /// The mapping is kept after deletion, so a replayed cancellation
    /// finds the replica already cancelled and stops there.
    async fn delete(&self, target: &Calendar, replica_id: String) -> MirrorResult<ReplicaAction> {
        match self.provider.get_event(&target.id, &replica_id).await {
            Ok(replica) if replica.is_cancelled() => {
                debug!(calendar = %target.id, replica = %replica_id, "replica already deleted");
                return Ok(ReplicaAction::Skipped(SkipReason::AlreadyDeleted));
            }
            Ok(_) => {}
            Err(MirrorError::EventNotFound { .. }) => {
                return Ok(ReplicaAction::Skipped(SkipReason::AlreadyDeleted));
            }
            Err(e) => return Err(e),
        }

        self.provider.delete_event(&target.id, &replica_id).await?;
        info!(calendar = %target.id, replica = %replica_id, "deleted replica");
        Ok(ReplicaAction::Deleted { replica_id })
    }

    /// Replicate `source` to each target in order, recording one outcome
    /// per target. A failing target never stops the remaining ones.
    pub async fn replicate_to_all<'c>(
        &self,
        source: &Event,
        targets: impl IntoIterator<Item = &'c Calendar>,
        report: &mut SyncReport,
    ) {
        for target in targets {
            let result = self.replicate(source, target).await.map_err(|e| {
                warn!(calendar = %target.id, event = %source.id, error = %e, "replication failed");
                e.to_string()
            });

            report.push(ReplicationOutcome {
                source_event_id: source.id.clone(),
                source_summary: source.summary.clone(),
                target_calendar_id: target.id.clone(),
                result,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventStatus, EventTime, Visibility};
    use crate::provider::MemoryProvider;
    use crate::provider::WriteKind;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn target(id: &str, enrolled: bool) -> Calendar {
        Calendar {
            id: id.to_string(),
            name: id.to_string(),
            is_primary: false,
            sync_enabled: enrolled,
        }
    }

    fn source(id: &str, title: &str) -> Event {
        Event {
            id: id.to_string(),
            summary: Some(title.to_string()),
            start: Some(EventTime::DateTime(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap())),
            end: Some(EventTime::DateTime(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap())),
            visibility: Some(Visibility::Private),
            ..Default::default()
        }
    }

    fn setup() -> (MemoryProvider, SyncStore<MemoryStore>, Calendar) {
        let provider = MemoryProvider::new();
        provider.add_calendar("t1", Some("自動同期"), false);
        (provider, SyncStore::new(MemoryStore::new()), target("t1", true))
    }

    #[tokio::test]
    async fn test_replay_updates_the_same_replica() {
        let (provider, store, t1) = setup();
        let replicator = Replicator::new(&provider, &store);

        let first = replicator.replicate(&source("a", "X"), &t1).await.unwrap();
        let ReplicaAction::Created { replica_id } = first else {
            panic!("expected create, got {first:?}");
        };

        let second = replicator.replicate(&source("a", "Y"), &t1).await.unwrap();
        assert_eq!(second, ReplicaAction::Updated { replica_id: replica_id.clone() });

        assert_eq!(provider.active_events("t1").len(), 1);
        assert_eq!(
            provider.event("t1", &replica_id).unwrap().summary.as_deref(),
            Some("Y")
        );
    }

    #[tokio::test]
    async fn test_update_preserves_target_only_fields_and_visibility() {
        let (provider, store, t1) = setup();
        let replicator = Replicator::new(&provider, &store);

        let ReplicaAction::Created { replica_id } =
            replicator.replicate(&source("a", "X"), &t1).await.unwrap()
        else {
            panic!("expected create");
        };

        provider
            .edit_event("t1", &replica_id, |e| {
                e.extra.insert("colorId".into(), json!("4"));
                e.visibility = Some(Visibility::Public);
            })
            .unwrap();

        let mut changed = source("a", "Y");
        changed.visibility = Some(Visibility::Confidential);
        replicator.replicate(&changed, &t1).await.unwrap();

        let replica = provider.event("t1", &replica_id).unwrap();
        assert_eq!(replica.summary.as_deref(), Some("Y"));
        assert_eq!(replica.extra.get("colorId"), Some(&json!("4")));
        assert_eq!(replica.visibility, Some(Visibility::Public));
    }

    #[tokio::test]
    async fn test_cancellation_deletes_once() {
        let (provider, store, t1) = setup();
        let replicator = Replicator::new(&provider, &store);
        replicator.replicate(&source("a", "X"), &t1).await.unwrap();

        let mut cancelled = source("a", "X");
        cancelled.status = EventStatus::Cancelled;

        let first = replicator.replicate(&cancelled, &t1).await.unwrap();
        assert!(matches!(first, ReplicaAction::Deleted { .. }));

        let replay = replicator.replicate(&cancelled, &t1).await.unwrap();
        assert_eq!(replay, ReplicaAction::Skipped(SkipReason::AlreadyDeleted));

        assert_eq!(provider.writes_to("t1", WriteKind::Delete), 1);
        assert!(provider.active_events("t1").is_empty());
        // Mapping survives the delete
        assert!(store.replica_id("a", "t1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_without_replica_is_noop() {
        let (provider, store, t1) = setup();
        let replicator = Replicator::new(&provider, &store);

        let mut cancelled = source("b", "B");
        cancelled.status = EventStatus::Cancelled;

        let action = replicator.replicate(&cancelled, &t1).await.unwrap();
        assert_eq!(action, ReplicaAction::Skipped(SkipReason::NothingToDelete));
        assert!(provider.writes().is_empty());
    }

    #[tokio::test]
    async fn test_unenrolled_target_is_never_written() {
        let (provider, store, _) = setup();
        provider.add_calendar("other", Some("personal"), false);
        let replicator = Replicator::new(&provider, &store);

        let action = replicator
            .replicate(&source("a", "X"), &target("other", false))
            .await
            .unwrap();

        assert_eq!(action, ReplicaAction::Skipped(SkipReason::NotEnrolled));
        assert!(provider.writes().is_empty());
        assert!(store.event_id_map().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_on_one_target_is_recorded_and_others_proceed() {
        let (provider, store, t1) = setup();
        provider.add_calendar("t2", Some("自動同期"), false);
        provider.fail_calendar("t1");
        let t2 = target("t2", true);
        let replicator = Replicator::new(&provider, &store);

        let mut report = SyncReport::default();
        replicator
            .replicate_to_all(&source("a", "X"), [&t1, &t2], &mut report)
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].is_failure());
        assert!(matches!(
            report.outcomes[1].result,
            Ok(ReplicaAction::Created { .. })
        ));
        assert_eq!(store.replica_id("a", "t1").unwrap(), None);
        assert!(store.replica_id("a", "t2").unwrap().is_some());
    }
}
