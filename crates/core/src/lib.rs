//! specifys-core: stage document contract and the generate/validate/repair loop.
//!
//! A caller hands over a stage name and a set of instructions; the core asks
//! the upstream model for a JSON document, stamps its `meta` envelope,
//! validates the stage payload, and repairs it within a fixed call budget.
//!
//! # Public API
//!
//! - [`orchestrate()`] -- the bounded retry-with-repair state machine
//! - [`call_model()`] -- one upstream round-trip, JSON parsed with fence tolerance
//! - [`validate_document()`] -- meta + stage validation via the stage registry
//! - [`stamp()`] -- overwrite the `meta` envelope with the call site's intent
//! - [`sanitize()`] / [`sanitize_tree()`] -- bound diagram ids and labels
//! - [`build_repair_prompt()`] -- follow-up instructions naming the violations
//! - [`mockup`] -- screen analysis and per-screen HTML mockups
//! - [`ModelClient`] -- upstream transport seam ([`OpenAiClient`] by default)

/// Schema version stamped into every stage document's `meta.version`.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Locale used when the caller does not supply one.
pub const DEFAULT_LOCALE: &str = "en-US";

pub mod diagram_fix;
pub mod error;
pub mod issue;
pub mod meta;
pub mod mockup;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;
pub mod orchestrate;
pub mod repair;
pub mod sanitize;
pub mod stage;
pub mod validate;

// ── Convenience re-exports ───────────────────────────────────────────

pub use diagram_fix::{DiagramFixRequest, FIX_DIAGRAM_STAGE};
pub use error::{ModelError, UpstreamError};
pub use issue::{Issue, IssueKind};
pub use meta::{stamp, stamp_at};
pub use mockup::{Mockup, MockupBatch, MockupContext, MockupError, Screen};
pub use model::{
    call_model, strip_code_fences, ChatRequest, Instructions, ModelClient, ModelReply,
    UpstreamProbe,
};
#[cfg(feature = "openai")]
pub use openai::OpenAiClient;
pub use orchestrate::{orchestrate, Attempt, Orchestration, StageRequest};
pub use repair::build_repair_prompt;
pub use sanitize::{sanitize, sanitize_tree, slugify, truncate_label};
pub use stage::Stage;
pub use validate::{validate_document, validate_meta, validate_payload};
