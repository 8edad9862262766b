//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use repo_publisher::output::{ColorChoice, OutputConfig};

use crate::commands;

/// Repo Publisher - Squash and relink a manifest, its layers and their sources for public release
#[derive(Parser, Debug)]
#[command(name = "repo-publisher")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorChoice,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish the manifest repository at a tag, with every layer and source it references
    Publish(commands::publish::PublishArgs),

    /// List the references a local checkout would be rewritten for
    Scan(commands::scan::ScanArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::new(self.color);

        match self.command {
            Commands::Publish(args) => commands::publish::execute(args, &output),
            Commands::Scan(args) => commands::scan::execute(args, &output),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // Only the first call installs a logger; later calls keep it.
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init()
        .ok();
}
