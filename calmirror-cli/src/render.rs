//! Colored terminal rendering for calmirror-core types.

use calmirror_core::Calendar;
use calmirror_core::sync::{
    BootstrapReport, ReplicaAction, ReplicaCounts, ReplicationOutcome, RunReport, SyncReport,
};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Calendar {
    fn render(&self) -> String {
        let role = if self.is_primary {
            "primary".cyan().to_string()
        } else if self.accepts_replicas() {
            "target".green().to_string()
        } else {
            "ignored".dimmed().to_string()
        };

        format!("📅 {} {} {}", self.name, self.id.dimmed(), role)
    }
}

impl Render for RunReport {
    fn render(&self) -> String {
        format!("📅 {}", self.calendar_id)
    }
}

impl Render for ReplicationOutcome {
    fn render(&self) -> String {
        let title = match &self.source_summary {
            Some(summary) => format!("{} ({})", summary, self.source_event_id),
            None => format!("({})", self.source_event_id),
        };
        let target = format!("→ {}", self.target_calendar_id);

        match &self.result {
            Ok(ReplicaAction::Created { .. }) => {
                format!("{} {} {}", "+".green(), title.green(), target.dimmed())
            }
            Ok(ReplicaAction::Updated { .. }) => {
                format!("{} {} {}", "~".yellow(), title.yellow(), target.dimmed())
            }
            Ok(ReplicaAction::Deleted { .. }) => {
                format!("{} {} {}", "-".red(), title.red(), target.dimmed())
            }
            Ok(ReplicaAction::Skipped(reason)) => {
                let detail = format!("{target}, {reason}");
                format!("{} {} {}", "·".dimmed(), title.dimmed(), detail.dimmed())
            }
            Err(error) => format!("{} {} {}: {}", "!".red(), title, target.dimmed(), error.red()),
        }
    }
}

/// Threshold for compact view (show counts instead of individual events)
const COMPACT_THRESHOLD: usize = 5;

fn pluralize<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Rendering of a [`SyncReport`], compact unless `verbose`.
pub trait SyncReportRender {
    fn render(&self, verbose: bool) -> String;
}

impl SyncReportRender for SyncReport {
    fn render(&self, verbose: bool) -> String {
        let counts = self.counts();
        if !counts.has_changes() && counts.failed == 0 && !verbose {
            return "   No changes".dimmed().to_string();
        }

        let changed = counts.created + counts.updated + counts.deleted;
        let mut lines = Vec::new();

        if verbose || changed <= COMPACT_THRESHOLD {
            for outcome in &self.outcomes {
                let skipped = matches!(outcome.result, Ok(ReplicaAction::Skipped(_)));
                if verbose || !skipped {
                    lines.push(format!("   {}", outcome.render()));
                }
            }
        } else {
            if counts.created > 0 {
                let label = format!("({} new {})", counts.created, pluralize(counts.created, "copy", "copies"));
                lines.push(format!("   {} {}", "+".green(), label.green()));
            }
            if counts.updated > 0 {
                let label = format!("({} changed {})", counts.updated, pluralize(counts.updated, "copy", "copies"));
                lines.push(format!("   {} {}", "~".yellow(), label.yellow()));
            }
            if counts.deleted > 0 {
                let label = format!("({} deleted {})", counts.deleted, pluralize(counts.deleted, "copy", "copies"));
                lines.push(format!("   {} {}", "-".red(), label.red()));
            }
            // Failures are always listed one by one
            for outcome in self.failures() {
                lines.push(format!("   {}", outcome.render()));
            }
        }

        if lines.is_empty() {
            return "   No changes".dimmed().to_string();
        }
        lines.join("\n")
    }
}

pub trait BootstrapRender {
    fn render(&self, verbose: bool) -> String;
}

impl BootstrapRender for BootstrapReport {
    fn render(&self, verbose: bool) -> String {
        let mut lines = vec![format!(
            "   {} {} old {} removed from targets",
            "Reset:".bold(),
            self.replicas_removed,
            pluralize(self.replicas_removed, "copy", "copies")
        )];

        if self.skipped_expired > 0 {
            lines.push(
                format!(
                    "   {} {} older than the retention window",
                    self.skipped_expired,
                    pluralize(self.skipped_expired, "event", "events")
                )
                .dimmed()
                .to_string(),
            );
        }

        lines.push(self.seeded.render(verbose));

        if self.sync_token.is_none() {
            lines.push(
                "   No sync token issued, the next sync resets again"
                    .yellow()
                    .to_string(),
            );
        }

        lines.join("\n")
    }
}

pub fn render_totals(counts: &ReplicaCounts) -> String {
    let mut line = format!(
        "Copies: {} created, {} updated, {} deleted",
        counts.created, counts.updated, counts.deleted
    );
    if counts.failed > 0 {
        line.push_str(&format!(", {}", format!("{} failed", counts.failed).red()));
    }
    line
}

/// Failed copies are not an error for the run; they get another chance
/// when their source event changes.
pub fn render_failure_warning(counts: &ReplicaCounts) -> Option<String> {
    if counts.failed == 0 {
        return None;
    }
    let line = format!(
        "{} {} failed and will be retried when the event changes again",
        counts.failed,
        pluralize(counts.failed, "copy", "copies")
    );
    Some(line.yellow().to_string())
}
