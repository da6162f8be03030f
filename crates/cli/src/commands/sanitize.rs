use std::path::Path;

use specifys_core::sanitize_tree;

use super::read_json;
use crate::OutputFormat;

pub(crate) fn cmd_sanitize(path: &Path, output: OutputFormat, quiet: bool) {
    let doc = read_json(path, output, quiet);
    let sanitized = sanitize_tree(&doc);

    let rendered = match output {
        OutputFormat::Text => serde_json::to_string_pretty(&sanitized),
        OutputFormat::Json => serde_json::to_string(&sanitized),
    };
    println!(
        "{}",
        rendered.unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}
