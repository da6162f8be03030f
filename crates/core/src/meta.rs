//! Metadata stamper: enforces the call site's `meta` envelope on a candidate.

use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::SCHEMA_VERSION;

/// Stamp `meta` using the current time for a missing or malformed timestamp.
pub fn stamp(doc: &mut Value, stage: &str, locale: &str) {
    stamp_at(doc, stage, locale, OffsetDateTime::now_utc());
}

/// Stamp `meta` onto `doc`, overwriting `version`, `locale` and `stage`.
///
/// `generatedAt` survives only when the candidate already carries a valid
/// RFC 3339 timestamp; otherwise it becomes `now`. Non-object candidates are
/// left untouched for the validator to reject.
pub fn stamp_at(doc: &mut Value, stage: &str, locale: &str, now: OffsetDateTime) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };

    let existing_timestamp = root
        .get("meta")
        .and_then(|m| m.get("generatedAt"))
        .and_then(Value::as_str)
        .filter(|ts| is_rfc3339(ts))
        .map(str::to_string);

    let generated_at =
        existing_timestamp.unwrap_or_else(|| now.format(&Rfc3339).unwrap_or_default());

    let meta = root
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if let Some(meta) = meta.as_object_mut() {
        meta.insert("version".into(), Value::String(SCHEMA_VERSION.into()));
        meta.insert("locale".into(), Value::String(locale.into()));
        meta.insert("generatedAt".into(), Value::String(generated_at));
        meta.insert("stage".into(), Value::String(stage.into()));
    }
}

/// True when `s` parses as an RFC 3339 / ISO-8601 timestamp.
pub fn is_rfc3339(s: &str) -> bool {
    OffsetDateTime::parse(s, &Rfc3339).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-03-01 12:00:00 UTC);

    #[test]
    fn inserts_meta_when_absent() {
        let mut doc = json!({"overview": {}});
        stamp_at(&mut doc, "overview", "en-US", NOW);
        assert_eq!(doc["meta"]["version"], SCHEMA_VERSION);
        assert_eq!(doc["meta"]["locale"], "en-US");
        assert_eq!(doc["meta"]["stage"], "overview");
        assert_eq!(doc["meta"]["generatedAt"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn overwrites_hallucinated_stage_and_version() {
        let mut doc = json!({
            "meta": {"version": "9.9", "stage": "market", "locale": "fr-FR"},
            "overview": {}
        });
        stamp_at(&mut doc, "overview", "he-IL", NOW);
        assert_eq!(doc["meta"]["version"], SCHEMA_VERSION);
        assert_eq!(doc["meta"]["stage"], "overview");
        assert_eq!(doc["meta"]["locale"], "he-IL");
    }

    #[test]
    fn keeps_well_formed_timestamp() {
        let mut doc = json!({"meta": {"generatedAt": "2025-12-24T08:30:00+02:00"}});
        stamp_at(&mut doc, "design", "en-US", NOW);
        assert_eq!(doc["meta"]["generatedAt"], "2025-12-24T08:30:00+02:00");
    }

    #[test]
    fn replaces_malformed_timestamp() {
        let mut doc = json!({"meta": {"generatedAt": "yesterday"}});
        stamp_at(&mut doc, "design", "en-US", NOW);
        assert_eq!(doc["meta"]["generatedAt"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn replaces_non_object_meta() {
        let mut doc = json!({"meta": "nope"});
        stamp_at(&mut doc, "rawText", "en-US", NOW);
        assert_eq!(doc["meta"]["stage"], "rawText");
    }

    #[test]
    fn stamping_twice_is_idempotent() {
        let mut doc = json!({"market": {}});
        stamp_at(&mut doc, "market", "en-US", NOW);
        let first = doc["meta"].clone();
        stamp_at(&mut doc, "market", "en-US", datetime!(2030-01-01 00:00:00 UTC));
        assert_eq!(doc["meta"], first);
    }

    #[test]
    fn leaves_non_objects_alone() {
        let mut doc = json!([1, 2, 3]);
        stamp_at(&mut doc, "overview", "en-US", NOW);
        assert_eq!(doc, json!([1, 2, 3]));
    }
}
