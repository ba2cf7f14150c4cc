//! Per-item results of a sync run.
//!
//! Each `(source event, target calendar)` pair gets exactly one
//! [`ReplicationOutcome`]. A failing pair is recorded here instead of
//! aborting the run, so partial failure is visible to the caller.

use std::fmt;

/// What the replicator did for one source event on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaAction {
    Created { replica_id: String },
    Updated { replica_id: String },
    Deleted { replica_id: String },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Target calendar is not enrolled.
    NotEnrolled,
    /// Cancelled source event was never replicated to this target.
    NothingToDelete,
    /// The replica is already gone.
    AlreadyDeleted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotEnrolled => write!(f, "target not enrolled"),
            SkipReason::NothingToDelete => write!(f, "no replica to delete"),
            SkipReason::AlreadyDeleted => write!(f, "replica already deleted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationOutcome {
    pub source_event_id: String,
    pub source_summary: Option<String>,
    pub target_calendar_id: String,
    /// Failure carries the rendered error.
    pub result: Result<ReplicaAction, String>,
}

impl ReplicationOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Totals over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicaCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReplicaCounts {
    pub fn add(&mut self, other: &ReplicaCounts) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn has_changes(&self) -> bool {
        self.created > 0 || self.updated > 0 || self.deleted > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub outcomes: Vec<ReplicationOutcome>,
}

impl SyncReport {
    pub fn push(&mut self, outcome: ReplicationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReplicationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Outcomes for one target calendar, in processing order.
    pub fn for_target<'a>(
        &'a self,
        target_calendar_id: &'a str,
    ) -> impl Iterator<Item = &'a ReplicationOutcome> {
        self.outcomes
            .iter()
            .filter(move |o| o.target_calendar_id == target_calendar_id)
    }

    pub fn counts(&self) -> ReplicaCounts {
        let mut counts = ReplicaCounts::default();
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(ReplicaAction::Created { .. }) => counts.created += 1,
                Ok(ReplicaAction::Updated { .. }) => counts.updated += 1,
                Ok(ReplicaAction::Deleted { .. }) => counts.deleted += 1,
                Ok(ReplicaAction::Skipped(_)) => counts.skipped += 1,
                Err(_) => counts.failed += 1,
            }
        }
        counts
    }
}

/// Result of a reset / bootstrap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapReport {
    /// Events deleted from target calendars before re-seeding.
    pub replicas_removed: usize,
    /// Primary events older than the retention horizon.
    pub skipped_expired: usize,
    pub seeded: SyncReport,
    /// Token recorded for the next incremental run, if the provider issued one.
    pub sync_token: Option<String>,
}

/// Result of an incremental run on the primary calendar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub calendar_id: String,
    /// Set when the run had to (re)bootstrap first.
    pub bootstrap: Option<BootstrapReport>,
    pub changed_events: usize,
    pub changes: SyncReport,
    /// Token persisted at the end of the run.
    pub sync_token: Option<String>,
}

impl RunReport {
    /// Totals over bootstrap seeding and incremental changes.
    pub fn counts(&self) -> ReplicaCounts {
        let mut counts = self.changes.counts();
        if let Some(bootstrap) = &self.bootstrap {
            counts.add(&bootstrap.seeded.counts());
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The invoking calendar is not the primary; nothing was done.
    NotPrimary { primary_id: String },
    Synced(RunReport),
}
