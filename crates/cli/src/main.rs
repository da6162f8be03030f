mod commands;
mod logging;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// specifys generation gateway.
#[derive(Parser)]
#[command(
    name = "specifys",
    version,
    about = "Generate, validate and repair specifys stage documents"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines instead of the compact human format
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP generation gateway
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8787")]
        port: u16,
    },

    /// Validate a stored stage document (meta envelope and stage payload)
    Validate {
        /// Stage name (overview, technical, market, design, diagrams, rawText, prompts)
        stage: String,
        /// Path to the stage document JSON file
        file: PathBuf,
    },

    /// Bound diagram ids and labels in a JSON document
    Sanitize {
        /// Path to the JSON file to sanitize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.log_json) {
        eprintln!("warning: failed to initialise logging: {}", e);
    }

    match cli.command {
        Commands::Serve { port } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("failed to create tokio runtime: {}", e),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(port)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Validate { stage, file } => {
            commands::validate::cmd_validate(&stage, &file, cli.output, cli.quiet);
        }
        Commands::Sanitize { file } => {
            commands::sanitize::cmd_sanitize(&file, cli.output, cli.quiet);
        }
    }
}

/// Print an error message to stderr in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
