//! Declarative field rules for the object-shaped stages.

use serde_json::Value;

use crate::issue::{Issue, IssueKind};

/// Expected JSON type of a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Shape {
    String,
    Object,
    Array,
    NonEmptyArray,
}

impl Shape {
    fn describe(self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Object => "object",
            Shape::Array => "array",
            Shape::NonEmptyArray => "non-empty array",
        }
    }

    fn with_article(self) -> &'static str {
        match self {
            Shape::String => "a string",
            Shape::Object => "an object",
            Shape::Array => "an array",
            Shape::NonEmptyArray => "a non-empty array",
        }
    }
}

/// A required field and the shape it must have.
pub(super) struct FieldRule {
    pub(super) name: &'static str,
    pub(super) shape: Shape,
}

const fn rule(name: &'static str, shape: Shape) -> FieldRule {
    FieldRule { name, shape }
}

const OVERVIEW: &[FieldRule] = &[
    rule("ideaSummary", Shape::String),
    rule("targetAudience", Shape::Object),
    rule("valueProposition", Shape::String),
    rule("coreFeaturesOverview", Shape::NonEmptyArray),
    rule("userJourneySummary", Shape::String),
];

const TECHNICAL: &[FieldRule] = &[
    rule("techStack", Shape::Object),
    rule("architectureOverview", Shape::String),
    rule("databaseSchema", Shape::Object),
    rule("apiEndpoints", Shape::Array),
    rule("securityAuthentication", Shape::Object),
    rule("integrationExternalApis", Shape::Object),
];

const MARKET: &[FieldRule] = &[
    rule("industryOverview", Shape::Object),
    rule("targetAudienceInsights", Shape::Object),
    rule("competitiveLandscape", Shape::Array),
    rule("swotAnalysis", Shape::Object),
    rule("monetizationModel", Shape::Object),
    rule("marketingStrategy", Shape::Object),
];

const DESIGN: &[FieldRule] = &[
    rule("visualStyleGuide", Shape::Object),
    rule("logoIconography", Shape::Object),
    rule("uiLayout", Shape::Object),
    rule("uxPrinciples", Shape::Object),
];

const RAW_TEXT: &[FieldRule] = &[
    rule("content", Shape::String),
    rule("paragraphs", Shape::Array),
    rule("summary", Shape::String),
];

pub(super) fn validate_overview(payload: &Value) -> Vec<Issue> {
    check_fields("overview", payload, OVERVIEW)
}

pub(super) fn validate_technical(payload: &Value) -> Vec<Issue> {
    check_fields("technical", payload, TECHNICAL)
}

pub(super) fn validate_market(payload: &Value) -> Vec<Issue> {
    check_fields("market", payload, MARKET)
}

pub(super) fn validate_design(payload: &Value) -> Vec<Issue> {
    check_fields("design", payload, DESIGN)
}

pub(super) fn validate_raw_text(payload: &Value) -> Vec<Issue> {
    check_fields("rawText", payload, RAW_TEXT)
}

/// Apply `rules` to `payload`, collecting one issue per violated field.
pub(super) fn check_fields(prefix: &str, payload: &Value, rules: &[FieldRule]) -> Vec<Issue> {
    let Some(obj) = payload.as_object() else {
        return vec![Issue::new(
            IssueKind::WrongType,
            format!("{} must be an object", prefix),
        )];
    };

    let mut issues = Vec::new();
    for rule in rules {
        let path = format!("{}.{}", prefix, rule.name);
        match obj.get(rule.name) {
            None | Some(Value::Null) => issues.push(Issue::new(
                IssueKind::MissingField,
                format!("{} is required ({})", path, rule.shape.describe()),
            )),
            Some(value) => {
                if let Some(issue) = check_shape(&path, value, rule.shape) {
                    issues.push(issue);
                }
            }
        }
    }
    issues
}

fn check_shape(path: &str, value: &Value, shape: Shape) -> Option<Issue> {
    let wrong_type = || {
        Some(Issue::new(
            IssueKind::WrongType,
            format!("{} must be {}", path, shape.with_article()),
        ))
    };
    match shape {
        Shape::String if value.is_string() => None,
        Shape::Object if value.is_object() => None,
        Shape::Array if value.is_array() => None,
        Shape::NonEmptyArray => match value.as_array() {
            Some(items) if items.is_empty() => Some(Issue::new(
                IssueKind::EmptyArray,
                format!("{} must be a non-empty array", path),
            )),
            Some(_) => None,
            None => wrong_type(),
        },
        _ => wrong_type(),
    }
}
