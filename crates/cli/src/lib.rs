pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use confidant_core::config::LoadOptions;

use commands::reference::ReferenceKind;

#[derive(Debug, Parser)]
#[command(
    name = "confidant",
    about = "Conversational front-end for a personal CRM",
    long_about = "Chat with the assistant, run catalog operations directly, and inspect configuration and CRM readiness.",
    after_help = "Examples:\n  confidant chat\n  confidant exec find_people --args '{\"query\": \"Alex\"}'\n  confidant operations --json\n  confidant doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a confidant.toml file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation (type quit or exit to leave)")]
    Chat,
    #[command(about = "Run one catalog operation and print the result envelope")]
    Exec {
        operation: String,
        #[arg(long, help = "Operation arguments as a JSON object")]
        args: Option<String>,
    },
    #[command(about = "List the operation catalog")]
    Operations {
        #[arg(long, help = "Emit the catalog as a JSON tool list")]
        json: bool,
    },
    #[command(about = "Split an assistant turn into display text and a delegated task")]
    Extract { text: String },
    #[command(about = "List reference data held by the CRM")]
    Reference {
        #[arg(value_enum)]
        kind: ReferenceKind,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM readiness, and CRM connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let result = match cli.command {
        Command::Chat => commands::chat::run(options),
        Command::Exec { operation, args } => {
            commands::exec::run(options, &operation, args.as_deref())
        }
        Command::Operations { json } => commands::operations::run(json),
        Command::Extract { text } => commands::extract::run(options, &text),
        Command::Reference { kind } => commands::reference::run(options, kind),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
