//! Typed validation issues.
//!
//! Every violation carries a machine-readable kind next to its human-readable
//! message, so the repair builder can dispatch on kind instead of scanning text.

use std::fmt;

use serde::{Serialize, Serializer};

/// Closed set of violation categories produced by the validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// The document (or a nested entry) is not a JSON object.
    NotAnObject,
    /// A required field is absent.
    MissingField,
    /// A field is present with the wrong JSON type.
    WrongType,
    /// An array that must have entries is empty.
    EmptyArray,
    /// An array has the wrong number of elements.
    Cardinality,
    /// A required diagram id is not covered.
    MissingDiagram,
    /// The same diagram id appears more than once.
    DuplicateDiagram,
    /// A text field is shorter than its floor.
    LengthTooShort,
    /// Too few `STAGE N:` markers.
    StageCountLow,
    /// No `STAGE 1` marker near the start of the text.
    StageOneMissing,
    /// An element of an array does not have the required shape.
    InvalidEntry,
    /// `meta` disagrees with the requested stage or supported version.
    MetaMismatch,
    /// The requested stage has no registered validator.
    UnknownStage,
    /// The model call failed or produced no parseable JSON.
    ModelCallFailed,
}

impl IssueKind {
    /// Stable upper-snake name used in logs.
    pub fn code(self) -> &'static str {
        match self {
            IssueKind::NotAnObject => "NOT_AN_OBJECT",
            IssueKind::MissingField => "MISSING_FIELD",
            IssueKind::WrongType => "WRONG_TYPE",
            IssueKind::EmptyArray => "EMPTY_ARRAY",
            IssueKind::Cardinality => "CARDINALITY",
            IssueKind::MissingDiagram => "MISSING_DIAGRAM",
            IssueKind::DuplicateDiagram => "DUPLICATE_DIAGRAM",
            IssueKind::LengthTooShort => "LENGTH_TOO_SHORT",
            IssueKind::StageCountLow => "STAGE_COUNT_LOW",
            IssueKind::StageOneMissing => "STAGE_ONE_MISSING",
            IssueKind::InvalidEntry => "INVALID_ENTRY",
            IssueKind::MetaMismatch => "META_MISMATCH",
            IssueKind::UnknownStage => "UNKNOWN_STAGE",
            IssueKind::ModelCallFailed => "MODEL_CALL_FAILED",
        }
    }

    /// Kinds that mean the prompts artifact came back truncated or lazy.
    pub fn is_incomplete_output(self) -> bool {
        matches!(
            self,
            IssueKind::LengthTooShort | IssueKind::StageCountLow | IssueKind::StageOneMissing
        )
    }
}

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The issue recorded when a model call yields no usable document.
    pub fn model_call_failed() -> Self {
        Self::new(IssueKind::ModelCallFailed, "model call failed or empty content")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// Over the wire an issue is just its message.
impl Serialize for Issue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message)
    }
}

/// Flatten issues into their messages.
pub fn messages(issues: &[Issue]) -> Vec<String> {
    issues.iter().map(|i| i.message.clone()).collect()
}
