//! Provider-neutral event types.
//!
//! Providers convert their API payloads into these types. Fields that
//! calmirror does not model (attendees, reminders, extended properties,
//! anything a human added on a target calendar) are kept verbatim in
//! [`Event::extra`] so they survive a read-modify-write cycle.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event (provider-neutral)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Provider-assigned id. Empty for events that were never created.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub status: EventStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    /// Whether event blocks time (opaque) or is free (transparent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<Transparency>,
    /// RRULE, EXRULE, RDATE and EXDATE lines for master events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,

    /// Everything else the provider returned for this event.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Start of the event as a UTC instant, if it has one.
    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref().map(EventTime::to_utc)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.summary {
            Some(summary) => write!(f, "{} ({})", summary, self.id),
            None => write!(f, "({})", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    /// All-day event
    Date(NaiveDate),
}

impl EventTime {
    /// All-day dates are read as midnight UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    /// Terminal soft delete; the event stays in the change feed.
    Cancelled,
}

/// Event transparency (busy/free status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    /// Event blocks time on calendar
    Opaque,
    /// Event does not block time (shows as free)
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Default,
    Public,
    Private,
    Confidential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_round_trip_through_extra() {
        let raw = json!({
            "id": "evt-1",
            "status": "confirmed",
            "summary": "Standup",
            "colorId": "5",
            "reminders": { "useDefault": false }
        });

        let event: Event = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(event.summary.as_deref(), Some("Standup"));
        assert_eq!(event.extra.get("colorId"), Some(&json!("5")));

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_minimal_cancelled_payload_parses() {
        let event: Event =
            serde_json::from_value(json!({ "id": "evt-2", "status": "cancelled" })).unwrap();
        assert!(event.is_cancelled());
        assert!(event.start.is_none());
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_all_day_start_is_utc_midnight() {
        let time = EventTime::Date(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
        assert_eq!(time.to_utc(), Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap());
    }
}
