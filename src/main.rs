//! # Feature Sync CLI
//!
//! This is the binary entry point for the `feature-sync` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the selected command.
//! - Turning the result into an exit code: 0 when there was nothing to
//!   report, 1 when drift or conflicts were found, 2 on a fatal error.
//!
//! The core logic lives in the `feature_sync` library crate; the binary is a
//! thin wrapper around it.

mod cli;
mod commands;

use clap::Parser;
use std::process::ExitCode;

use commands::Outcome;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Findings) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
