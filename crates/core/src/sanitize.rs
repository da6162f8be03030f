//! Diagram/label sanitizer.
//!
//! Bounds free-form diagram data before it leaves the service: ids become
//! lowercase hyphenated slugs of at most [`MAX_ID_CHARS`] characters, labels
//! are cut to [`MAX_LABEL_CHARS`] characters ending in an ellipsis. Only the
//! `nodes`, `edges`, `stages` and `slices` arrays are touched. The pass is
//! total and idempotent.

use serde_json::{Map, Number, Value};

/// Maximum length of a sanitized id.
pub const MAX_ID_CHARS: usize = 64;

/// Maximum length of a sanitized label, ellipsis included.
pub const MAX_LABEL_CHARS: usize = 60;

const ELLIPSIS: char = '…';

const DIAGRAM_KEYS: [&str; 4] = ["nodes", "edges", "stages", "slices"];

/// Lowercase `raw`, collapse every non-alphanumeric run into one hyphen,
/// trim hyphens and cap the result at [`MAX_ID_CHARS`].
///
/// Returns an empty string when `raw` has no alphanumeric characters.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug.truncate(MAX_ID_CHARS);
    slug.trim_end_matches('-').to_string()
}

/// Cut `raw` to [`MAX_LABEL_CHARS`] characters ending with `…` when it is
/// longer; shorter labels are trimmed.
///
/// The length check runs on the untrimmed text so a long label always comes
/// out at exactly [`MAX_LABEL_CHARS`].
pub fn truncate_label(raw: &str) -> String {
    let count = raw.chars().count();
    if count > MAX_LABEL_CHARS {
        let mut label: String = raw.chars().take(MAX_LABEL_CHARS - 1).collect();
        label.push(ELLIPSIS);
        return label;
    }
    // Already truncated: keep as is so a second pass is a no-op.
    if count == MAX_LABEL_CHARS && raw.ends_with(ELLIPSIS) {
        return raw.to_string();
    }
    raw.trim().to_string()
}

/// Sanitize the diagram arrays of a single payload object.
///
/// Anything that is not an object, and every key other than the four
/// diagram arrays, passes through unchanged.
pub fn sanitize(payload: &Value) -> Value {
    let Some(obj) = payload.as_object() else {
        return payload.clone();
    };

    let mut out = obj.clone();
    if let Some(Value::Array(nodes)) = obj.get("nodes") {
        out.insert("nodes".into(), Value::Array(sanitize_nodes(nodes)));
    }
    if let Some(Value::Array(edges)) = obj.get("edges") {
        out.insert("edges".into(), Value::Array(sanitize_edges(edges)));
    }
    if let Some(Value::Array(stages)) = obj.get("stages") {
        out.insert("stages".into(), Value::Array(sanitize_stages(stages)));
    }
    if let Some(Value::Array(slices)) = obj.get("slices") {
        out.insert("slices".into(), Value::Array(sanitize_slices(slices)));
    }
    Value::Object(out)
}

/// Apply [`sanitize`] to every object in `value` that carries a diagram array.
pub fn sanitize_tree(value: &Value) -> Value {
    match value {
        Value::Object(obj) => {
            let walked: Map<String, Value> = obj
                .iter()
                .map(|(k, v)| (k.clone(), sanitize_tree(v)))
                .collect();
            let walked = Value::Object(walked);
            let has_diagram_array = DIAGRAM_KEYS
                .iter()
                .any(|key| walked.get(*key).is_some_and(Value::is_array));
            if has_diagram_array {
                sanitize(&walked)
            } else {
                walked
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_tree).collect()),
        other => other.clone(),
    }
}

fn sanitize_nodes(nodes: &[Value]) -> Vec<Value> {
    nodes
        .iter()
        .enumerate()
        .filter_map(|(i, node)| match node {
            Value::Object(obj) => {
                let raw_id = str_field(obj, "id");
                let raw_label = str_field(obj, "label");
                let id = non_empty_slug(raw_id.or(raw_label))
                    .unwrap_or_else(|| format!("node-{}", i + 1));
                let label = truncate_label(raw_label.or(raw_id).unwrap_or(&id));
                let mut out = obj.clone();
                out.insert("id".into(), Value::String(id));
                out.insert("label".into(), Value::String(label));
                Some(Value::Object(out))
            }
            Value::String(text) => {
                let id = non_empty_slug(Some(text.as_str()))
                    .unwrap_or_else(|| format!("node-{}", i + 1));
                let mut out = Map::new();
                out.insert("id".into(), Value::String(id));
                out.insert("label".into(), Value::String(truncate_label(text)));
                Some(Value::Object(out))
            }
            _ => None,
        })
        .collect()
}

fn sanitize_edges(edges: &[Value]) -> Vec<Value> {
    edges
        .iter()
        .filter_map(|edge| {
            let Value::Object(obj) = edge else {
                return Some(edge.clone());
            };
            // An edge without both endpoints cannot be rendered.
            let from = non_empty_slug(str_field(obj, "from"))?;
            let to = non_empty_slug(str_field(obj, "to"))?;
            let mut out = obj.clone();
            out.insert("from".into(), Value::String(from));
            out.insert("to".into(), Value::String(to));
            if let Some(label) = str_field(obj, "label") {
                out.insert("label".into(), Value::String(truncate_label(label)));
            }
            Some(Value::Object(out))
        })
        .collect()
}

fn sanitize_stages(stages: &[Value]) -> Vec<Value> {
    stages
        .iter()
        .map(|stage| {
            let Value::Object(obj) = stage else {
                return stage.clone();
            };
            let mut out = obj.clone();
            let section = str_field(obj, "section")
                .or_else(|| str_field(obj, "label"))
                .or_else(|| str_field(obj, "name"))
                .unwrap_or("");
            out.insert("section".into(), Value::String(truncate_label(section)));
            if let Some(Value::Array(steps)) = obj.get("steps") {
                let steps = steps
                    .iter()
                    .filter_map(|step| step.as_object().map(sanitize_step))
                    .collect();
                out.insert("steps".into(), Value::Array(steps));
            }
            Value::Object(out)
        })
        .collect()
}

fn sanitize_step(step: &Map<String, Value>) -> Value {
    let mut out = step.clone();
    let label = str_field(step, "label").unwrap_or("");
    let actor = str_field(step, "actor").unwrap_or("");
    out.insert("label".into(), Value::String(truncate_label(label)));
    out.insert("score".into(), numeric(step.get("score")));
    out.insert("actor".into(), Value::String(truncate_label(actor)));
    Value::Object(out)
}

fn sanitize_slices(slices: &[Value]) -> Vec<Value> {
    slices
        .iter()
        .map(|slice| {
            let Value::Object(obj) = slice else {
                return slice.clone();
            };
            let mut out = obj.clone();
            let label = str_field(obj, "label").unwrap_or("");
            out.insert("label".into(), Value::String(truncate_label(label)));
            out.insert("value".into(), numeric(obj.get("value")));
            Value::Object(out)
        })
        .collect()
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn non_empty_slug(raw: Option<&str>) -> Option<String> {
    raw.map(slugify).filter(|s| !s.is_empty())
}

/// Coerce a number or numeric string to a JSON number, defaulting to 0.
fn numeric(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0)),
        _ => Value::from(0),
    }
}
