//! # Repo Publisher CLI
//!
//! This is the binary entry point for the `repo-publisher` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging and output styling from the global flags.
//! - Executing the selected command and turning library errors into a
//!   non-zero exit with a readable message.
//!
//! The publication logic lives in the `repo_publisher` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
