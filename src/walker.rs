//! Entry point of a publication run.
//!
//! `GraphWalker` resolves the manifest repository at a tag, publishes it as
//! the root of the graph and reports which checkouts still need a push.

use std::path::PathBuf;

use log::{info, warn};

use crate::config::PublicationConfig;
use crate::engine::{PublicationEngine, Role};
use crate::error::{Error, Result};
use crate::report::PublicationReport;
use crate::repository::{GitOperations, RepositoryHandle};

pub struct GraphWalker<'a> {
    git: &'a dyn GitOperations,
    config: &'a PublicationConfig,
}

impl<'a> GraphWalker<'a> {
    pub fn new(git: &'a dyn GitOperations, config: &'a PublicationConfig) -> Self {
        Self { git, config }
    }

    /// Publish the manifest repository at `tag` and everything below it.
    ///
    /// `message` becomes the subject of every publication commit.
    pub fn run(&self, tag: &str, message: &str) -> Result<PublicationReport> {
        let manifest = &self.config.manifest;
        let handle = RepositoryHandle::open(self.git, self.config, &manifest.name, &manifest.url)?;
        let commit = self
            .git
            .tag_commit(handle.path(), tag)?
            .ok_or_else(|| Error::UnresolvableRevision {
                repository: manifest.name.clone(),
                revision: tag.to_string(),
            })?;
        info!("Tag {} of {} is {}", tag, manifest.name, commit);

        let mut engine = PublicationEngine::new(self.git, self.config, message);
        let root = engine.publish(Role::Manifest, &manifest.name, &manifest.url, &commit)?;
        let records = engine.into_records();

        let mut unpushed: Vec<PathBuf> = Vec::new();
        for record in &records {
            let handle = RepositoryHandle::bind(self.git, self.config, &record.name);
            if handle.has_unpushed_publication(self.config)? {
                unpushed.push(record.path.clone());
            }
        }
        if unpushed.is_empty() {
            info!("Every publication branch is already on the public remote");
        } else {
            warn!(
                "{} repositories hold publication commits not pushed yet",
                unpushed.len()
            );
        }

        Ok(PublicationReport::new(self.config, tag, root, records, unpushed))
    }
}
