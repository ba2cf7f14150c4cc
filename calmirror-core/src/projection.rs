//! Restricted field projection used to build replica payloads.

use crate::event::Event;

/// Event fields copied from a source event onto its replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicatedField {
    Summary,
    Start,
    End,
    Description,
    Location,
    Transparency,
    Recurrence,
    Visibility,
}

/// Fields refreshed on every update of an existing replica.
pub const UPDATE_FIELDS: &[ReplicatedField] = &[
    ReplicatedField::Summary,
    ReplicatedField::Start,
    ReplicatedField::End,
    ReplicatedField::Description,
    ReplicatedField::Location,
    ReplicatedField::Transparency,
    ReplicatedField::Recurrence,
];

/// Fields written when a replica is first created. Visibility is only set
/// here so operators can change it per target afterwards.
pub const CREATE_FIELDS: &[ReplicatedField] = &[
    ReplicatedField::Summary,
    ReplicatedField::Start,
    ReplicatedField::End,
    ReplicatedField::Description,
    ReplicatedField::Location,
    ReplicatedField::Transparency,
    ReplicatedField::Recurrence,
    ReplicatedField::Visibility,
];

impl ReplicatedField {
    fn copy(self, from: &Event, to: &mut Event) {
        match self {
            ReplicatedField::Summary => to.summary = from.summary.clone(),
            ReplicatedField::Start => to.start = from.start.clone(),
            ReplicatedField::End => to.end = from.end.clone(),
            ReplicatedField::Description => to.description = from.description.clone(),
            ReplicatedField::Location => to.location = from.location.clone(),
            ReplicatedField::Transparency => to.transparency = from.transparency,
            ReplicatedField::Recurrence => to.recurrence = from.recurrence.clone(),
            ReplicatedField::Visibility => to.visibility = from.visibility,
        }
    }
}

/// Build a new event from `base` where every field in `fields` is taken
/// from `overlay` (cleared if the overlay does not carry it) and every
/// other field, including id, status and `extra`, is kept from `base`.
pub fn project(base: &Event, overlay: &Event, fields: &[ReplicatedField]) -> Event {
    let mut merged = base.clone();
    for field in fields {
        field.copy(overlay, &mut merged);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventTime, Transparency, Visibility};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn replica() -> Event {
        let mut extra = serde_json::Map::new();
        extra.insert("colorId".into(), json!("11"));
        Event {
            id: "replica-1".into(),
            summary: Some("Old title".into()),
            location: Some("Room 4".into()),
            transparency: Some(Transparency::Transparent),
            visibility: Some(Visibility::Private),
            extra,
            ..Default::default()
        }
    }

    fn source() -> Event {
        Event {
            id: "source-1".into(),
            summary: Some("New title".into()),
            start: Some(EventTime::DateTime(Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap())),
            end: Some(EventTime::DateTime(Utc.with_ymd_and_hms(2025, 3, 20, 16, 0, 0).unwrap())),
            visibility: Some(Visibility::Public),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_keeps_fields_outside_the_set() {
        let merged = project(&replica(), &source(), UPDATE_FIELDS);

        assert_eq!(merged.id, "replica-1");
        assert_eq!(merged.extra.get("colorId"), Some(&json!("11")));
        assert_eq!(merged.visibility, Some(Visibility::Private));
        assert_eq!(merged.summary.as_deref(), Some("New title"));
        assert_eq!(merged.start, source().start);
    }

    #[test]
    fn test_update_clears_fields_the_source_dropped() {
        let merged = project(&replica(), &source(), UPDATE_FIELDS);

        assert_eq!(merged.location, None);
        assert_eq!(merged.transparency, None);
    }

    #[test]
    fn test_create_copies_visibility_onto_empty_base() {
        let merged = project(&Event::default(), &source(), CREATE_FIELDS);

        assert!(merged.id.is_empty());
        assert_eq!(merged.visibility, Some(Visibility::Public));
        assert!(merged.extra.is_empty());
    }
}
