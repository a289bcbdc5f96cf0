use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::entity::{
    AccessPolicy, EntityDescriptor, Field, FieldKind, Reference, ADMIN_ONLY,
};

pub static SESSIONS: EntityDescriptor = EntityDescriptor {
    label: "Session",
    path: "sessions",
    table: "sessions",
    fields: &[
        Field::text("title").required(),
        Field::text("description"),
        Field::new("tutor_id", FieldKind::Uuid),
        Field::new("batch_id", FieldKind::Uuid),
        Field::new("date", FieldKind::Timestamp).required(),
        Field::text("time"),
        Field::new("duration", FieldKind::Integer).defaulted(),
        Field::text("status").defaulted(),
        Field::text("meeting_link"),
    ],
    references: &[
        Reference::new("tutor_id", "users", "Tutor"),
        Reference::new("batch_id", "batches", "Batch"),
    ],
    owner_column: "created_by",
    owner_scoped: &[],
    access: AccessPolicy {
        read: ADMIN_ONLY,
        create: ADMIN_ONLY,
        modify: ADMIN_ONLY,
    },
    view: r#"
        SELECT s.*,
               u.name AS tutor_name,
               b.name AS batch_name
          FROM sessions s
          LEFT JOIN users u ON s.tutor_id = u.id
          LEFT JOIN batches b ON s.batch_id = b.id"#,
    fallback_view: None,
    parent_filter: None,
    order_by: "date DESC",
    prepare: Some(combine_date_and_time),
};

/// Keeps `date` and `time` describing the same moment.
///
/// A bare `date` is combined with the request's `time`, else the stored `time`, else midnight.
/// On update, a `time` sent without a `date` moves the stored day to that time.
fn combine_date_and_time(body: &mut Map<String, Value>, stored: Option<&Value>) {
    let body_time = text(body.get("time"));

    let date = match body.get("date") {
        Some(value) => match text(Some(value)) {
            Some(d) if !d.contains('T') => d,
            _ => return,
        },
        None => match (&body_time, stored_day(stored)) {
            (Some(_), Some(day)) => day,
            _ => return,
        },
    };
    let time = body_time
        .or_else(|| text(stored.and_then(|row| row.get("time"))))
        .unwrap_or_else(|| "00:00:00".into());
    body.insert("date".into(), Value::String(format!("{date}T{time}")));
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Calendar day (UTC) of the stored timestamp.
fn stored_day(stored: Option<&Value>) -> Option<String> {
    let raw = stored?.get("date")?.as_str()?;
    let at = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(at.with_timezone(&Utc).format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prepared(value: Value) -> Map<String, Value> {
        let mut body = value.as_object().cloned().unwrap();
        combine_date_and_time(&mut body, None);
        body
    }

    fn updated(value: Value, stored: Value) -> Map<String, Value> {
        let mut body = value.as_object().cloned().unwrap();
        combine_date_and_time(&mut body, Some(&stored));
        body
    }

    fn stored() -> Value {
        json!({ "date": "2025-04-02T14:30:00+00:00", "time": "14:30" })
    }

    #[test]
    fn bare_date_takes_the_time_field() {
        let body = prepared(json!({ "date": "2025-04-02", "time": "14:30" }));
        assert_eq!(body["date"], "2025-04-02T14:30");
        assert_eq!(body["time"], "14:30");
    }

    #[test]
    fn bare_date_without_time_is_midnight() {
        let body = prepared(json!({ "date": "2025-04-02" }));
        assert_eq!(body["date"], "2025-04-02T00:00:00");
    }

    #[test]
    fn full_timestamp_is_left_alone() {
        let body = prepared(json!({ "date": "2025-04-02T08:00:00Z", "time": "14:30" }));
        assert_eq!(body["date"], "2025-04-02T08:00:00Z");
    }

    #[test]
    fn time_is_required_to_move_a_new_session() {
        let body = prepared(json!({ "time": "09:00" }));
        assert!(body.get("date").is_none());
    }

    #[test]
    fn new_time_moves_the_stored_day() {
        let body = updated(json!({ "time": "09:00" }), stored());
        assert_eq!(body["date"], "2025-04-02T09:00");
        assert_eq!(body["time"], "09:00");
    }

    #[test]
    fn stored_day_is_read_in_utc() {
        let body = updated(
            json!({ "time": "09:00" }),
            json!({ "date": "2025-04-02T01:30:00+02:00", "time": "01:30" }),
        );
        assert_eq!(body["date"], "2025-04-01T09:00");
    }

    #[test]
    fn new_day_keeps_the_stored_time() {
        let body = updated(json!({ "date": "2025-05-01" }), stored());
        assert_eq!(body["date"], "2025-05-01T14:30");
    }

    #[test]
    fn new_day_and_time_are_combined_on_update() {
        let body = updated(json!({ "date": "2025-05-01", "time": "08:15" }), stored());
        assert_eq!(body["date"], "2025-05-01T08:15");
    }

    #[test]
    fn unrelated_update_leaves_date_alone() {
        let body = updated(json!({ "title": "Renamed" }), stored());
        assert!(body.get("date").is_none());

        let body = updated(json!({ "date": null }), stored());
        assert_eq!(body["date"], Value::Null);
    }

    #[test]
    fn combined_value_decodes_as_timestamp() {
        let body = prepared(json!({ "title": "Kickoff", "date": "2025-04-02", "time": "09:15" }));
        let values = SESSIONS
            .collect(&body, crate::models::entity::WriteMode::Create)
            .unwrap();
        let date = values.iter().find(|(f, _)| f.name == "date").unwrap();
        assert!(!date.1.is_null());
    }
}
