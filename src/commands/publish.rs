//! # Publish Command Implementation
//!
//! Runs a full publication: the manifest repository at the given tag, every
//! layer it lists and every source those layers' recipes cite each get one
//! publication commit, with references rewritten to the public coordinates.
//!
//! Nothing is pushed. The command ends with the list of checkouts holding
//! unpushed publication commits and the commands that push them.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use repo_publisher::config;
use repo_publisher::output::{Marker, OutputConfig};
use repo_publisher::report::PublicationReport;
use repo_publisher::repository::DefaultGitOperations;
use repo_publisher::walker::GraphWalker;

/// Arguments for the publish command
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Tag of the manifest repository to publish
    #[arg(value_name = "TAG")]
    pub tag: String,

    /// Subject of every publication commit
    #[arg(value_name = "MESSAGE")]
    pub message: String,

    /// Path to the publication configuration
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "REPO_PUBLISHER_CONFIG",
        default_value = repo_publisher::defaults::CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Directory holding the checkouts (overrides `checkout_root`)
    #[arg(long, value_name = "DIR")]
    pub checkout_root: Option<PathBuf>,

    /// Start publication branches from a root commit even if origin has one
    #[arg(long)]
    pub restart: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Execute the publish command
pub fn execute(args: PublishArgs, output: &OutputConfig) -> Result<()> {
    let mut config = config::from_file(&args.config).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            args.config.display()
        )
    })?;
    if let Some(root) = args.checkout_root {
        config.checkout_root = root;
    }
    if args.restart {
        config.publication.restart = true;
    }

    let git = DefaultGitOperations;
    let report = GraphWalker::new(&git, &config)
        .run(&args.tag, &args.message)
        .with_context(|| format!("Publication of {} failed", args.tag))?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report, output)?;
    }
    Ok(())
}

fn print_report(report: &PublicationReport, output: &OutputConfig) -> Result<()> {
    println!(
        "{} {}",
        output.marker(Marker::Done),
        output.heading(&format!(
            "Published {} repositories from tag {}",
            report.records.len(),
            report.tag
        ))
    );
    println!();
    println!("{} {}", output.marker(Marker::Graph), output.heading("Publication graph"));
    print!("{}", report.render_tree()?);

    if report.unpushed.is_empty() {
        println!();
        println!("{} Nothing left to push", output.marker(Marker::Done));
        return Ok(());
    }

    println!();
    println!(
        "{} {}",
        output.marker(Marker::Warning),
        output.heading("Repositories with unpushed publication commits")
    );
    for path in &report.unpushed {
        println!("   {}", path.display());
    }
    println!();
    println!(
        "{} {}",
        output.marker(Marker::Push),
        output.heading("Review, then push with")
    );
    for command in &report.push_commands {
        println!("   {}", command);
    }
    Ok(())
}
