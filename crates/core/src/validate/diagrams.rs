//! Diagrams stage: exactly six diagrams covering a fixed id set.

use std::collections::HashSet;

use serde_json::Value;

use crate::issue::{Issue, IssueKind};

/// Diagram ids every diagrams payload must cover, one diagram each.
pub const REQUIRED_DIAGRAM_IDS: [&str; 6] = [
    "user_flow",
    "system_architecture",
    "information_architecture",
    "data_schema",
    "sequence",
    "frontend_components",
];

pub(super) fn validate_diagrams(payload: &Value) -> Vec<Issue> {
    let Some(diagrams) = payload.as_array() else {
        return vec![Issue::new(
            IssueKind::WrongType,
            "diagrams must be an array",
        )];
    };

    let mut issues = Vec::new();

    if diagrams.len() != REQUIRED_DIAGRAM_IDS.len() {
        issues.push(Issue::new(
            IssueKind::Cardinality,
            format!(
                "diagrams must contain exactly {} diagrams (found {})",
                REQUIRED_DIAGRAM_IDS.len(),
                diagrams.len()
            ),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (i, diagram) in diagrams.iter().enumerate() {
        if !diagram.is_object() {
            issues.push(Issue::new(
                IssueKind::InvalidEntry,
                format!("diagrams[{}] must be an object", i),
            ));
            continue;
        }
        match diagram.get("id").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => {
                if !seen.insert(id) {
                    issues.push(Issue::new(
                        IssueKind::DuplicateDiagram,
                        format!("diagrams contains duplicate id '{}'", id),
                    ));
                }
            }
            _ => issues.push(Issue::new(
                IssueKind::InvalidEntry,
                format!("diagrams[{}].id must be a non-empty string", i),
            )),
        }
    }

    for required in REQUIRED_DIAGRAM_IDS {
        if !seen.contains(required) {
            issues.push(Issue::new(
                IssueKind::MissingDiagram,
                format!("diagrams is missing required diagram '{}'", required),
            ));
        }
    }

    issues
}
