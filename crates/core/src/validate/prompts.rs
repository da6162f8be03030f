//! Prompts stage: the exhaustive build prompt and third-party integrations.
//!
//! `fullPrompt` is expected to be a long, staged implementation guide.
//! Truncated or lazy output is a known failure mode, so length and stage
//! markers are checked structurally.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::issue::{Issue, IssueKind};

/// Minimum `fullPrompt` length, in characters.
pub const MIN_FULL_PROMPT_CHARS: usize = 25_000;

/// Minimum number of `STAGE N:` markers in `fullPrompt`.
pub const MIN_STAGE_MARKERS: usize = 10;

/// `STAGE 1` must appear within this many characters of meaningful content.
pub const STAGE_ONE_WINDOW_CHARS: usize = 2_000;

static STAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"STAGE\s+\d+\s*:").expect("valid stage marker regex"));

static STAGE_ONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"STAGE\s+1\b").expect("valid stage one regex"));

pub(super) fn validate_prompts(payload: &Value) -> Vec<Issue> {
    let Some(obj) = payload.as_object() else {
        return vec![Issue::new(IssueKind::WrongType, "prompts must be an object")];
    };

    let mut issues = Vec::new();

    match obj.get("fullPrompt") {
        None | Some(Value::Null) => issues.push(Issue::new(
            IssueKind::MissingField,
            "prompts.fullPrompt is required (string)",
        )),
        Some(Value::String(text)) => issues.extend(check_full_prompt(text)),
        Some(_) => issues.push(Issue::new(
            IssueKind::WrongType,
            "prompts.fullPrompt must be a string",
        )),
    }

    match obj.get("thirdPartyIntegrations") {
        None | Some(Value::Null) => issues.push(Issue::new(
            IssueKind::MissingField,
            "prompts.thirdPartyIntegrations is required (array)",
        )),
        Some(Value::Array(entries)) => {
            for (i, entry) in entries.iter().enumerate() {
                issues.extend(check_integration(i, entry));
            }
        }
        Some(_) => issues.push(Issue::new(
            IssueKind::WrongType,
            "prompts.thirdPartyIntegrations must be an array",
        )),
    }

    issues
}

fn check_full_prompt(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    let length = text.chars().count();
    if length < MIN_FULL_PROMPT_CHARS {
        issues.push(Issue::new(
            IssueKind::LengthTooShort,
            format!(
                "prompts.fullPrompt is too short: {} characters (minimum {} characters required)",
                length, MIN_FULL_PROMPT_CHARS
            ),
        ));
    }

    let markers = STAGE_MARKER.find_iter(text).count();
    if markers < MIN_STAGE_MARKERS {
        issues.push(Issue::new(
            IssueKind::StageCountLow,
            format!(
                "prompts.fullPrompt has {} stages marked 'STAGE N:' (minimum {} stages required)",
                markers, MIN_STAGE_MARKERS
            ),
        ));
    }

    let meaningful = text.trim_start();
    let window: String = meaningful.chars().take(STAGE_ONE_WINDOW_CHARS).collect();
    if !STAGE_ONE.is_match(&window) {
        issues.push(Issue::new(
            IssueKind::StageOneMissing,
            format!(
                "prompts.fullPrompt is incomplete: 'STAGE 1' must appear within the first {} characters",
                STAGE_ONE_WINDOW_CHARS
            ),
        ));
    }

    issues
}

fn check_integration(index: usize, entry: &Value) -> Vec<Issue> {
    let path = format!("prompts.thirdPartyIntegrations[{}]", index);
    let Some(obj) = entry.as_object() else {
        return vec![Issue::new(
            IssueKind::InvalidEntry,
            format!("{} must be an object", path),
        )];
    };

    let mut issues = Vec::new();
    for field in ["service", "description"] {
        let ok = obj
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !ok {
            issues.push(Issue::new(
                IssueKind::InvalidEntry,
                format!("{}.{} must be a non-empty string", path, field),
            ));
        }
    }

    let instructions_ok = obj
        .get("instructions")
        .and_then(Value::as_array)
        .is_some_and(|steps| {
            !steps.is_empty()
                && steps
                    .iter()
                    .all(|s| s.as_str().is_some_and(|s| !s.trim().is_empty()))
        });
    if !instructions_ok {
        issues.push(Issue::new(
            IssueKind::InvalidEntry,
            format!(
                "{}.instructions must be a non-empty array of non-empty strings",
                path
            ),
        ));
    }

    issues
}
