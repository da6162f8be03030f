//! Single Mermaid diagram repair.
//!
//! Runs through the orchestrator as a one-stage job whose validator accepts
//! any JSON reply; the corrected source is pulled out afterwards.

use serde::Deserialize;
use serde_json::Value;

use crate::issue::Issue;
use crate::model::{strip_code_fences, Instructions};

/// Stage name stamped onto diagram-fix replies.
pub const FIX_DIAGRAM_STAGE: &str = "diagramFix";

/// Characters of each optional context document included in the prompt.
pub const MAX_CONTEXT_CHARS: usize = 4_000;

/// A broken diagram and the context that produced it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramFixRequest {
    pub diagram_id: String,
    pub diagram_type: String,
    pub broken_code: String,
    #[serde(default)]
    pub technical_spec: Option<Value>,
    #[serde(default)]
    pub overview: Option<Value>,
}

impl DiagramFixRequest {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.diagram_id.trim().is_empty() {
            missing.push("diagramId");
        }
        if self.diagram_type.trim().is_empty() {
            missing.push("diagramType");
        }
        if self.broken_code.trim().is_empty() {
            missing.push("brokenCode");
        }
        missing
    }

    /// Instructions asking for `{"correctedCode": "..."}`.
    pub fn instructions(&self) -> Instructions {
        let system = "You are an expert in Mermaid diagram syntax. You repair diagrams that \
                      fail to render while preserving their meaning, nodes and labels.";
        let developer = "Respond with a single JSON object of the form \
                         {\"correctedCode\": \"<mermaid source>\"}. The mermaid source must not \
                         be wrapped in code fences. Do not add commentary.";

        let mut user = format!(
            "Diagram id: {}\nDiagram type: {}\n\nThe following Mermaid code fails to render:\n{}\n",
            self.diagram_id, self.diagram_type, self.broken_code
        );
        if let Some(context) = self.technical_spec.as_ref().and_then(context_text) {
            user.push_str("\nTechnical specification (excerpt):\n");
            user.push_str(&context);
            user.push('\n');
        }
        if let Some(context) = self.overview.as_ref().and_then(context_text) {
            user.push_str("\nProduct overview (excerpt):\n");
            user.push_str(&context);
            user.push('\n');
        }
        user.push_str(
            "\nReturn the corrected diagram of the same type. Keep node ids stable and quote \
             labels that contain punctuation.",
        );

        Instructions::new(system, developer, user)
    }
}

/// Diagram-fix replies are never rejected structurally.
pub fn accept_any(_doc: &Value) -> Result<(), Vec<Issue>> {
    Ok(())
}

/// Pull the corrected Mermaid source out of an accepted reply.
///
/// Accepts `correctedCode` or `code` on an object, or a bare JSON string.
pub fn extract_corrected_code(doc: &Value) -> Option<String> {
    let raw = match doc {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => obj
            .get("correctedCode")
            .or_else(|| obj.get("code"))
            .and_then(Value::as_str),
        _ => None,
    }?;
    let code = strip_code_fences(raw).trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

fn context_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_CONTEXT_CHARS).collect())
}
