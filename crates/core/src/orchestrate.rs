//! Retry-with-repair orchestrator.
//!
//! ```text
//! INITIAL_CALL -> VALIDATE -> SUCCESS
//!                          -> REPAIR_CALL -> VALIDATE -> SUCCESS
//!                                                     -> FINAL_CALL -> VALIDATE -> SUCCESS | FAILED
//! ```
//!
//! At most three model calls per request. The repair call replaces the user
//! instruction with a repair prompt; the final call re-issues the original
//! instructions unchanged. An [`UpstreamError`] aborts immediately.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ModelError, UpstreamError};
use crate::issue::Issue;
use crate::meta::stamp;
use crate::model::{call_model, Instructions, ModelClient, ModelReply};
use crate::repair::build_repair_prompt;

/// One model call in the fixed attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The caller's original instructions.
    Initial,
    /// Original system/developer instructions with a repair prompt as user.
    Repair,
    /// The original instructions once more, for a fresh sample.
    Final,
}

impl Attempt {
    pub const SEQUENCE: [Attempt; 3] = [Attempt::Initial, Attempt::Repair, Attempt::Final];

    pub fn as_str(self) -> &'static str {
        match self {
            Attempt::Initial => "initial",
            Attempt::Repair => "repair",
            Attempt::Final => "final",
        }
    }
}

/// What the caller wants generated.
#[derive(Debug, Clone)]
pub struct StageRequest {
    /// Stage name as requested; stamped into `meta.stage`.
    pub stage: String,
    pub locale: String,
    pub instructions: Instructions,
}

/// Terminal state of one orchestration.
#[derive(Debug, Clone, PartialEq)]
pub enum Orchestration {
    /// A stamped document that passed validation.
    Accepted { document: Value, attempts: usize },
    /// Every attempt failed; `issues` come from the most recent attempt.
    Failed { issues: Vec<Issue>, attempts: usize },
}

impl Orchestration {
    pub fn attempts(&self) -> usize {
        match self {
            Orchestration::Accepted { attempts, .. } | Orchestration::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Generate, stamp and validate a stage document within the call budget.
///
/// `validate` sees the stamped candidate. Parse failures and non-upstream
/// client errors become the issue `model call failed or empty content` and
/// are repaired like any other violation.
pub async fn orchestrate<F>(
    client: &dyn ModelClient,
    request: &StageRequest,
    validate: F,
) -> Result<Orchestration, UpstreamError>
where
    F: Fn(&Value) -> Result<(), Vec<Issue>>,
{
    let mut issues: Vec<Issue> = Vec::new();
    let mut candidate: Option<Value> = None;

    for (index, attempt) in Attempt::SEQUENCE.into_iter().enumerate() {
        let instructions = match attempt {
            Attempt::Repair => {
                let original = candidate
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_else(|| "{}".to_string());
                request
                    .instructions
                    .with_user(build_repair_prompt(&issues, &original))
            }
            Attempt::Initial | Attempt::Final => request.instructions.clone(),
        };

        debug!(stage = %request.stage, attempt = attempt.as_str(), "calling model");

        match call_model(client, &instructions).await {
            Err(ModelError::Upstream(err)) => {
                warn!(
                    stage = %request.stage,
                    attempt = attempt.as_str(),
                    status = err.status,
                    "upstream error, aborting orchestration"
                );
                return Err(err);
            }
            Err(err) => {
                warn!(stage = %request.stage, attempt = attempt.as_str(), error = %err, "model call failed");
                issues = vec![Issue::model_call_failed()];
                candidate = None;
            }
            Ok(ModelReply::Unparseable(_)) => {
                warn!(stage = %request.stage, attempt = attempt.as_str(), "model reply was not JSON");
                issues = vec![Issue::model_call_failed()];
                candidate = None;
            }
            Ok(ModelReply::Json(mut doc)) => {
                stamp(&mut doc, &request.stage, &request.locale);
                match validate(&doc) {
                    Ok(()) => {
                        info!(stage = %request.stage, attempt = attempt.as_str(), "document accepted");
                        return Ok(Orchestration::Accepted {
                            document: doc,
                            attempts: index + 1,
                        });
                    }
                    Err(found) => {
                        warn!(
                            stage = %request.stage,
                            attempt = attempt.as_str(),
                            issues = found.len(),
                            "document failed validation"
                        );
                        issues = found;
                        candidate = Some(doc);
                    }
                }
            }
        }
    }

    Ok(Orchestration::Failed {
        issues,
        attempts: Attempt::SEQUENCE.len(),
    })
}
