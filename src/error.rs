//! # Error Handling
//!
//! This module defines the centralized error type for `repo-publisher`. It
//! uses the `thiserror` library to build a single `Error` enum covering every
//! anticipated failure mode of a publication run.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of everything that can go wrong. Variants carry the
//!   repository, file and values involved so an aborted run says exactly what
//!   it could not decide.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! A publication rewrites history irreversibly, so the library never recovers
//! locally: every variant except `NothingToCommit` aborts the whole run.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for repo-publisher operations
#[derive(Error, Debug)]
pub enum Error {
    /// A tag, branch or commit could not be found in a repository.
    #[error("Unresolvable revision '{revision}' in repository {repository}")]
    UnresolvableRevision {
        repository: String,
        revision: String,
    },

    /// A single provenance file yields more than one candidate for a field.
    ///
    /// The rewrite target would be undetermined, so the run stops here.
    #[error("Ambiguous {field} in {}: found {}", file.display(), candidates.join(", "))]
    AmbiguousReference {
        file: PathBuf,
        field: String,
        candidates: Vec<String>,
    },

    /// A field required to build a reference is absent from a file.
    #[error("Missing {field} in {}", file.display())]
    MissingReferenceField { file: PathBuf, field: String },

    /// A commit was requested but the working tree carries no changes.
    #[error("Nothing to commit in {repository}")]
    NothingToCommit { repository: String },

    /// The same checkout was requested at two different commits in one run.
    #[error("Repository {repository} already published from {published}, cannot publish {requested} in the same run")]
    ConflictingRevision {
        repository: String,
        published: String,
        requested: String,
    },

    /// A repository references itself through its own references.
    #[error("Cycle detected in repository references: {cycle}")]
    CycleDetected { cycle: String },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {repository}: {command} - {stderr}")]
    GitCommand {
        command: String,
        repository: String,
        stderr: String,
    },

    /// The manifest could not be parsed or written back.
    #[error("Manifest error in {}: {message}", file.display())]
    Manifest { file: PathBuf, message: String },

    /// An error occurred while parsing the publication configuration.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
