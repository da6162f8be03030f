use std::path::Path;
use std::process;

use specifys_core::validate_document;

use super::read_json;
use crate::OutputFormat;

pub(crate) fn cmd_validate(stage: &str, path: &Path, output: OutputFormat, quiet: bool) {
    let doc = read_json(path, output, quiet);

    match validate_document(stage, &doc) {
        Ok(()) => {
            if !quiet {
                match output {
                    OutputFormat::Text => println!("valid {} document", stage),
                    OutputFormat::Json => {
                        println!("{}", serde_json::json!({ "valid": true, "stage": stage }));
                    }
                }
            }
        }
        Err(issues) => {
            match output {
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("invalid {} document", stage);
                        for issue in &issues {
                            eprintln!("  - {}", issue);
                        }
                    }
                }
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "valid": false,
                        "stage": stage,
                        "issues": issues,
                    });
                    eprintln!(
                        "{}",
                        serde_json::to_string_pretty(&json).unwrap_or_default()
                    );
                }
            }
            process::exit(1);
        }
    }
}
