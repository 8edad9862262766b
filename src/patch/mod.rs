//! Reference rewriting for the supported artifact formats
//!
//! The counterpart of `extract`: given the reference as it was read and the
//! published reference that supersedes it, every file in the old reference's
//! provenance is rewritten in the working tree. Nothing is staged or
//! committed here; the engine decides when and with which message.
//!
//! - Manifest (manifest.rs) - attribute updates through the XML tree
//! - Recipe (recipe.rs) - scoped textual substitutions

pub mod manifest;
pub mod recipe;

use log::debug;

use crate::config::PublicationConfig;
use crate::error::Result;
use crate::reference::{ProvenanceKind, PublishedReference, RepositoryReference};

/// Rewrite every provenance file of `old` to cite `new`. Returns how many
/// files changed.
pub fn apply(
    config: &PublicationConfig,
    old: &RepositoryReference,
    new: &PublishedReference,
) -> Result<usize> {
    debug!("Patch {} -> {}", old, new);
    let mut changed = 0;
    match old.provenance.kind {
        ProvenanceKind::Manifest => {
            for file in &old.provenance.files {
                if manifest::apply(config, file, old, new)? {
                    changed += 1;
                }
            }
        }
        ProvenanceKind::Recipe => {
            let patch = recipe::RecipePatch::new(config, old, new)?;
            for file in &old.provenance.files {
                if patch.apply(file)? {
                    changed += 1;
                }
            }
        }
    }
    Ok(changed)
}
