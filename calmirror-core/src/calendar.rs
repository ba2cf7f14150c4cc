//! Calendars taking part in replication.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, MirrorResult};

/// A calendar as listed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

/// A calendar with its replication role resolved for the current run.
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    pub is_primary: bool,
    /// The description starts with the enrollment marker.
    pub sync_enabled: bool,
}

impl Calendar {
    pub fn resolve(entry: CalendarEntry, marker: &str) -> Self {
        let sync_enabled = entry
            .description
            .as_deref()
            .is_some_and(|d| d.starts_with(marker));

        Calendar {
            name: entry
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "(unnamed)".to_string()),
            id: entry.id,
            is_primary: entry.primary,
            sync_enabled,
        }
    }

    /// Whether replicas of primary events may be written here.
    /// The primary is excluded even when its description carries the marker.
    pub fn accepts_replicas(&self) -> bool {
        self.sync_enabled && !self.is_primary
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.id)
    }
}

/// The calendars seen by one run, in provider listing order.
#[derive(Debug, Clone)]
pub struct CalendarSet {
    calendars: Vec<Calendar>,
}

impl CalendarSet {
    pub fn resolve(entries: Vec<CalendarEntry>, marker: &str) -> Self {
        CalendarSet {
            calendars: entries
                .into_iter()
                .map(|e| Calendar::resolve(e, marker))
                .collect(),
        }
    }

    pub fn primary(&self) -> MirrorResult<&Calendar> {
        self.calendars
            .iter()
            .find(|c| c.is_primary)
            .ok_or(MirrorError::NoPrimaryCalendar)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Calendar> {
        self.calendars.iter().filter(|c| c.accepts_replicas())
    }

    pub fn all(&self) -> &[Calendar] {
        &self.calendars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "自動同期";

    fn entry(id: &str, description: Option<&str>, primary: bool) -> CalendarEntry {
        CalendarEntry {
            id: id.to_string(),
            summary: Some(id.to_uppercase()),
            description: description.map(String::from),
            primary,
        }
    }

    #[test]
    fn test_marker_prefix_enrolls_calendar() {
        let cal = Calendar::resolve(entry("work", Some("自動同期 from personal"), false), MARKER);
        assert!(cal.sync_enabled);
        assert!(cal.accepts_replicas());
    }

    #[test]
    fn test_marker_elsewhere_does_not_enroll() {
        let cal = Calendar::resolve(entry("work", Some("Team calendar 自動同期"), false), MARKER);
        assert!(!cal.sync_enabled);

        let cal = Calendar::resolve(entry("work", None, false), MARKER);
        assert!(!cal.sync_enabled);
    }

    #[test]
    fn test_primary_never_accepts_replicas() {
        let cal = Calendar::resolve(entry("me", Some("自動同期"), true), MARKER);
        assert!(cal.sync_enabled);
        assert!(!cal.accepts_replicas());
    }

    #[test]
    fn test_calendar_set_preserves_listing_order() {
        let set = CalendarSet::resolve(
            vec![
                entry("b", Some(MARKER), false),
                entry("me", None, true),
                entry("x", Some("nope"), false),
                entry("a", Some(MARKER), false),
            ],
            MARKER,
        );

        assert_eq!(set.primary().unwrap().id, "me");
        let targets: Vec<_> = set.targets().map(|c| c.id.as_str()).collect();
        assert_eq!(targets, ["b", "a"]);
    }

    #[test]
    fn test_missing_primary_is_an_error() {
        let set = CalendarSet::resolve(vec![entry("a", Some(MARKER), false)], MARKER);
        assert!(matches!(set.primary(), Err(MirrorError::NoPrimaryCalendar)));
    }
}
