//! Stage document validation.
//!
//! One validator per stage, looked up through a registry keyed by stage name,
//! plus a validator for the `meta` envelope. Validators only check structure
//! (presence, type, element counts) and never short-circuit: every violation
//! found is reported so a single repair round can address all of them.

mod diagrams;
mod prompts;
mod shapes;

use serde_json::Value;

use crate::issue::{Issue, IssueKind};
use crate::meta::is_rfc3339;
use crate::stage::Stage;
use crate::SCHEMA_VERSION;

pub use diagrams::REQUIRED_DIAGRAM_IDS;
pub use prompts::{MIN_FULL_PROMPT_CHARS, MIN_STAGE_MARKERS, STAGE_ONE_WINDOW_CHARS};

/// Checks a stage payload and returns every violation found.
pub type StageValidator = fn(&Value) -> Vec<Issue>;

/// Stage name -> payload validator.
const REGISTRY: [(Stage, StageValidator); 7] = [
    (Stage::Overview, shapes::validate_overview),
    (Stage::Technical, shapes::validate_technical),
    (Stage::Market, shapes::validate_market),
    (Stage::Design, shapes::validate_design),
    (Stage::Diagrams, diagrams::validate_diagrams),
    (Stage::RawText, shapes::validate_raw_text),
    (Stage::Prompts, prompts::validate_prompts),
];

/// Look up the payload validator registered for a stage name.
pub fn validator_for(stage_name: &str) -> Option<StageValidator> {
    REGISTRY
        .iter()
        .find(|(stage, _)| stage.as_str() == stage_name)
        .map(|(_, validator)| *validator)
}

/// Validate a bare stage payload (the value under the stage key).
pub fn validate_payload(stage: Stage, payload: &Value) -> Vec<Issue> {
    match validator_for(stage.as_str()) {
        Some(validator) => validator(payload),
        None => vec![unknown_stage(stage.as_str())],
    }
}

/// Validate the `meta` envelope against the requested stage.
pub fn validate_meta(meta: Option<&Value>, stage_name: &str) -> Vec<Issue> {
    let Some(meta) = meta else {
        return vec![Issue::new(IssueKind::MissingField, "meta is required (object)")];
    };
    let Some(meta) = meta.as_object() else {
        return vec![Issue::new(IssueKind::WrongType, "meta must be an object")];
    };

    let mut issues = Vec::new();

    match meta.get("version").and_then(Value::as_str) {
        Some(SCHEMA_VERSION) => {}
        Some(other) => issues.push(Issue::new(
            IssueKind::MetaMismatch,
            format!(
                "meta.version must be '{}' (found '{}')",
                SCHEMA_VERSION, other
            ),
        )),
        None => issues.push(Issue::new(
            IssueKind::MissingField,
            "meta.version is required (string)",
        )),
    }

    match meta.get("stage").and_then(Value::as_str) {
        Some(s) if s == stage_name => {}
        Some(other) => issues.push(Issue::new(
            IssueKind::MetaMismatch,
            format!("meta.stage must be '{}' (found '{}')", stage_name, other),
        )),
        None => issues.push(Issue::new(
            IssueKind::MissingField,
            "meta.stage is required (string)",
        )),
    }

    match meta.get("locale").and_then(Value::as_str) {
        Some(locale) if !locale.trim().is_empty() => {}
        _ => issues.push(Issue::new(
            IssueKind::MissingField,
            "meta.locale is required (non-empty string)",
        )),
    }

    match meta.get("generatedAt").and_then(Value::as_str) {
        Some(ts) if is_rfc3339(ts) => {}
        Some(ts) => issues.push(Issue::new(
            IssueKind::WrongType,
            format!("meta.generatedAt must be an ISO-8601 timestamp (found '{}')", ts),
        )),
        None => issues.push(Issue::new(
            IssueKind::MissingField,
            "meta.generatedAt is required (ISO-8601 string)",
        )),
    }

    issues
}

/// Validate a whole stage document: object shape, `meta`, then the payload.
///
/// An unknown stage name is reported as an issue rather than a separate error.
pub fn validate_document(stage_name: &str, doc: &Value) -> Result<(), Vec<Issue>> {
    let Some(root) = doc.as_object() else {
        return Err(vec![Issue::new(
            IssueKind::NotAnObject,
            "document must be a JSON object",
        )]);
    };

    let mut issues = validate_meta(root.get("meta"), stage_name);

    match validator_for(stage_name) {
        None => issues.push(unknown_stage(stage_name)),
        Some(validator) => match root.get(stage_name) {
            Some(payload) => issues.extend(validator(payload)),
            None => issues.push(Issue::new(
                IssueKind::MissingField,
                format!("{} payload is required", stage_name),
            )),
        },
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn unknown_stage(stage_name: &str) -> Issue {
    let known: Vec<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
    Issue::new(
        IssueKind::UnknownStage,
        format!(
            "unknown stage '{}' (expected one of: {})",
            stage_name,
            known.join(", ")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(stage: &str) -> Value {
        json!({
            "version": SCHEMA_VERSION,
            "locale": "en-US",
            "generatedAt": "2026-03-01T12:00:00Z",
            "stage": stage,
        })
    }

    #[test]
    fn registry_covers_every_stage() {
        for stage in Stage::ALL {
            assert!(validator_for(stage.as_str()).is_some(), "{}", stage);
        }
        assert!(validator_for("summary").is_none());
    }

    #[test]
    fn valid_meta_has_no_issues() {
        assert!(validate_meta(Some(&meta("design")), "design").is_empty());
    }

    #[test]
    fn meta_stage_mismatch_is_rejected() {
        let issues = validate_meta(Some(&meta("market")), "design");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MetaMismatch);
        assert!(issues[0].message.contains("meta.stage"));
    }

    #[test]
    fn meta_version_mismatch_is_rejected() {
        let mut m = meta("design");
        m["version"] = json!("0.1");
        let issues = validate_meta(Some(&m), "design");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("meta.version"));
    }

    #[test]
    fn missing_meta_is_reported() {
        let issues = validate_meta(None, "design");
        assert_eq!(issues[0].kind, IssueKind::MissingField);
    }

    #[test]
    fn document_with_wrong_meta_fails_even_with_valid_payload() {
        let doc = json!({
            "meta": meta("overview"),
            "rawText": {"content": "c", "paragraphs": ["p"], "summary": "s"},
        });
        let issues = validate_document("rawText", &doc).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::MetaMismatch));
    }

    #[test]
    fn unknown_stage_is_an_issue() {
        let doc = json!({"meta": meta("summary"), "summary": {}});
        let issues = validate_document("summary", &doc).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnknownStage);
    }

    #[test]
    fn missing_payload_is_reported() {
        let doc = json!({"meta": meta("design")});
        let issues = validate_document("design", &doc).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("design payload"));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let issues = validate_document("design", &json!("text")).unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::NotAnObject);
    }

    #[test]
    fn valid_raw_text_document_passes() {
        let doc = json!({
            "meta": meta("rawText"),
            "rawText": {"content": "c", "paragraphs": ["p"], "summary": "s"},
        });
        assert!(validate_document("rawText", &doc).is_ok());
    }
}
