//! Rewriting a layer reference inside the XML manifest.

use std::path::Path;

use log::{info, warn};

use crate::config::PublicationConfig;
use crate::error::Result;
use crate::extract::manifest::ManifestDocument;
use crate::reference::{PublishedReference, RepositoryReference};

/// Point the internal remote at the public base URL and pin every project
/// called `old.name` to the publication commit. Returns whether the file changed.
pub fn apply(
    config: &PublicationConfig,
    file: &Path,
    old: &RepositoryReference,
    new: &PublishedReference,
) -> Result<bool> {
    let mut document = ManifestDocument::load(file)?;
    let before = document.to_xml()?;

    let remote = &config.manifest.remote;
    if !document.set_remote_fetch(remote, &config.publication.manifest_url) {
        warn!("Remote '{}' not declared in {}", remote, file.display());
    }
    let updated = document.set_project_revision(&old.name, &new.revision);
    if updated == 0 {
        warn!("Project '{}' not found in {}", old.name, file.display());
    }

    let after = document.to_xml()?;
    if after == before {
        return Ok(false);
    }
    document.save()?;
    info!(
        "Rewrote {}: {} -> {} ({})",
        file.display(),
        old.name,
        new.revision,
        config.publication.manifest_url
    );
    Ok(true)
}
