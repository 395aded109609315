//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::commands::{self, Outcome};

/// Feature Sync - Keep projects in line with versioned feature templates
#[derive(Parser, Debug)]
#[command(name = "feature-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report drift between projects and their feature templates
    Status(commands::status::StatusArgs),

    /// Plan and apply changes that bring projects back in line
    Sync(commands::sync::SyncArgs),

    /// Show which feature owns which path in a project
    Explain(commands::explain::ExplainArgs),

    /// Declare a feature version in a project config
    Add(commands::add::AddArgs),

    /// Validate projects and feature definitions
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<Outcome> {
        env_logger::Builder::from_env(Env::default().default_filter_or(self.log_level.as_str()))
            .format_timestamp(None)
            .try_init()
            .ok();

        match self.command {
            Commands::Status(args) => commands::status::execute(args, &self.color),
            Commands::Sync(args) => commands::sync::execute(args, &self.color),
            Commands::Explain(args) => commands::explain::execute(args),
            Commands::Add(args) => commands::add::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
