//! Repair prompt builder.
//!
//! Turns the violations of a rejected candidate into a follow-up user
//! instruction that asks the model to fix only those violations. When the
//! prompts artifact came back truncated, the instruction re-teaches the full
//! ten-stage structure instead of just pointing at the gap.

use crate::issue::Issue;
use crate::validate::{MIN_FULL_PROMPT_CHARS, MIN_STAGE_MARKERS};

/// Prefix of the rejected candidate appended for context, in characters.
pub const MAX_ORIGINAL_CHARS: usize = 15_000;

/// Build-stage headings the `fullPrompt` must walk through, in order.
pub const BUILD_STAGES: [&str; 10] = [
    "STAGE 1: PROJECT SETUP & BASIC STRUCTURE",
    "STAGE 2: FRONTEND CORE FUNCTIONALITY",
    "STAGE 3: AUTHENTICATION & USER MANAGEMENT",
    "STAGE 4: BACKEND API DEVELOPMENT",
    "STAGE 5: DATABASE INTEGRATION",
    "STAGE 6: CORE FEATURES IMPLEMENTATION",
    "STAGE 7: THIRD-PARTY INTEGRATIONS",
    "STAGE 8: TESTING & QUALITY ASSURANCE",
    "STAGE 9: SECURITY & PERFORMANCE",
    "STAGE 10: DEPLOYMENT & LAUNCH",
];

/// Build the repair user instruction for `issues` found in `original_json`.
pub fn build_repair_prompt(issues: &[Issue], original_json: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("Your previous JSON output failed validation.\n\n");
    prompt.push_str("Issues found:\n");
    for (i, issue) in issues.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, issue.message));
    }
    prompt.push('\n');
    prompt.push_str(
        "Fix ONLY the issues listed above. Keep every other field, value and id exactly as it \
         was; do not rename keys, reorder arrays or restructure the document.\n",
    );
    prompt.push_str(
        "Return ONLY the corrected JSON object. No Markdown, no code fences, no commentary.\n",
    );

    if issues.iter().any(|i| i.kind.is_incomplete_output()) {
        prompt.push('\n');
        prompt.push_str(&incomplete_output_guidance());
    }

    prompt.push_str(&format!(
        "\nOriginal JSON (first {} characters):\n",
        MAX_ORIGINAL_CHARS
    ));
    prompt.push_str(&truncate_chars(original_json, MAX_ORIGINAL_CHARS));
    prompt.push('\n');
    prompt
}

/// Elaboration appended when `fullPrompt` was too short or missing stages.
fn incomplete_output_guidance() -> String {
    let mut text = String::new();
    text.push_str("CRITICAL: prompts.fullPrompt is incomplete. Rewrite it in full.\n\n");
    text.push_str(&format!(
        "It must contain all {} build stages below, in this order, each heading written exactly \
         as shown:\n",
        MIN_STAGE_MARKERS
    ));
    for stage in BUILD_STAGES {
        text.push_str(&format!("- {}\n", stage));
    }
    text.push('\n');
    text.push_str(
        "Every stage must be broken into numbered sub-steps (1.1, 1.2, 2.1, ...), each with \
         concrete actions, file names and acceptance checks.\n",
    );
    text.push_str(
        "Carry over every detail from the upstream specification: every feature, every screen, \
         every database table and field, every API endpoint with method and payload, and the \
         full visual style guide (colors, typography, spacing, components).\n",
    );
    text.push_str(&format!(
        "The fullPrompt MUST be at least {} characters long. This minimum is non-negotiable; \
         shorter output will be rejected again.\n",
        MIN_FULL_PROMPT_CHARS
    ));
    text
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
