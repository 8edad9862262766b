//! Reference extraction for the supported artifact formats
//!
//! A checkout cites further internal repositories in one of two ways, each
//! with its own submodule:
//!
//! - Manifest (manifest.rs) - `project` elements of a single XML manifest,
//!   bound to the internal remote
//! - Recipe (recipe.rs) - free-text build recipes carrying an internal URL,
//!   a revision variable and a branch variable
//!
//! Both produce `RepositoryReference` values whose provenance lists the files
//! the reference was read from, which is what the patcher later rewrites.

pub mod manifest;
pub mod recipe;

use std::path::Path;

use serde::Serialize;

use crate::config::PublicationConfig;
use crate::error::Result;
use crate::reference::RepositoryReference;

/// Which reader applies to a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Manifest,
    Recipe,
}

/// Extract every reference of `repo_root` with the given strategy.
pub fn extract(
    config: &PublicationConfig,
    strategy: Strategy,
    repo_root: &Path,
) -> Result<Vec<RepositoryReference>> {
    match strategy {
        Strategy::Manifest => manifest::extract(config, repo_root),
        Strategy::Recipe => recipe::RecipeScanner::new(config)?.scan(repo_root),
    }
}
