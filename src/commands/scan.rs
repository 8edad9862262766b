//! # Scan Command Implementation
//!
//! Lists the references a local checkout cites, exactly as a publication run
//! would extract them. Nothing is cloned, committed or rewritten, which makes
//! this the way to review rewrite targets (and catch ambiguous recipes)
//! before publishing.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use repo_publisher::config;
use repo_publisher::extract::{self, Strategy};
use repo_publisher::output::{Marker, OutputConfig};
use repo_publisher::reference::{self, RepositoryReference};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanFormat {
    Text,
    Json,
}

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Checkout to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Read the XML manifest instead of recipes
    #[arg(long)]
    pub manifest: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ScanFormat,

    /// Path to the publication configuration
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "REPO_PUBLISHER_CONFIG",
        default_value = repo_publisher::defaults::CONFIG_FILE
    )]
    pub config: PathBuf,
}

/// Execute the scan command
pub fn execute(args: ScanArgs, output: &OutputConfig) -> Result<()> {
    let config = config::from_file(&args.config).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            args.config.display()
        )
    })?;
    if !args.path.is_dir() {
        anyhow::bail!("Not a directory: {}", args.path.display());
    }

    let strategy = if args.manifest {
        Strategy::Manifest
    } else {
        Strategy::Recipe
    };
    let references = extract::extract(&config, strategy, &args.path)
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    match args.format {
        ScanFormat::Json => println!("{}", reference::to_json(&references)?),
        ScanFormat::Text => print_references(&args, &references, output),
    }
    Ok(())
}

fn print_references(args: &ScanArgs, references: &[RepositoryReference], output: &OutputConfig) {
    println!(
        "{} {}",
        output.marker(Marker::Search),
        output.heading(&format!(
            "{} reference(s) in {}",
            references.len(),
            args.path.display()
        ))
    );
    for reference in references {
        println!();
        println!("   {}", reference);
        for file in &reference.provenance.files {
            let shown = file.strip_prefix(&args.path).unwrap_or(file);
            println!("      {}", shown.display());
        }
    }
}
