//! # Publication Engine
//!
//! Publishes one repository and, recursively, everything it references.
//!
//! For each repository the engine runs, in order:
//!
//! 1. **Checkout**: acquire the checkout at the declared revision.
//! 2. **Extract**: read child references with the strategy of the
//!    repository's role. Sources have no strategy and skip to step 5.
//! 3. **Recurse**: publish every child first, reusing the memoized result
//!    when a child was already published in this run.
//! 4. **Patch**: rewrite each child reference to its published coordinates.
//! 5. **Intermediate commit**: layers lose their purged files, then a dirty
//!    working tree is committed with the role's intermediate message.
//! 6. **Squash**: one publication commit carrying HEAD's tree.
//!
//! Any error aborts the whole run. Checkouts are left in place and are
//! reused by the next invocation.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use walkdir::WalkDir;

use crate::cache::PublicationCache;
use crate::config::PublicationConfig;
use crate::error::{Error, Result};
use crate::extract::{self, Strategy};
use crate::patch;
use crate::reference::PublishedReference;
use crate::repository::{GitOperations, RepositoryHandle};

/// Position of a repository in the publication graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The root repository holding the XML manifest.
    Manifest,
    /// A repository listed in the manifest, holding recipes.
    Layer,
    /// A repository cited by a recipe.
    Source,
}

impl Role {
    /// How child references are read, if at all.
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            Role::Manifest => Some(Strategy::Manifest),
            Role::Layer => Some(Strategy::Recipe),
            Role::Source => None,
        }
    }

    /// Role of the repositories this one references.
    pub fn child_role(self) -> Role {
        match self {
            Role::Manifest => Role::Layer,
            Role::Layer | Role::Source => Role::Source,
        }
    }

    fn intermediate_message(self, config: &PublicationConfig) -> &str {
        match self {
            Role::Manifest => &config.messages.manifest_intermediate,
            Role::Layer | Role::Source => &config.messages.layer_intermediate,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Manifest => write!(f, "manifest"),
            Role::Layer => write!(f, "layer"),
            Role::Source => write!(f, "source"),
        }
    }
}

/// One repository published during the run.
#[derive(Debug, Clone, Serialize)]
pub struct PublicationRecord {
    pub role: Role,
    pub name: String,
    pub path: PathBuf,
    pub source_commit: String,
    pub published: PublishedReference,
    /// Checkout paths of the repositories it references, in discovery order.
    pub children: Vec<PathBuf>,
}

/// Drives the recursive publication of a repository graph.
pub struct PublicationEngine<'a> {
    git: &'a dyn GitOperations,
    config: &'a PublicationConfig,
    message: String,
    cache: PublicationCache,
    records: Vec<PublicationRecord>,
}

impl<'a> PublicationEngine<'a> {
    /// `message` is the subject of every publication commit.
    pub fn new(git: &'a dyn GitOperations, config: &'a PublicationConfig, message: &str) -> Self {
        Self {
            git,
            config,
            message: message.to_string(),
            cache: PublicationCache::new(),
            records: Vec::new(),
        }
    }

    /// Publish `url/name` at `revision` and everything it references.
    pub fn publish(
        &mut self,
        role: Role,
        name: &str,
        url: &str,
        revision: &str,
    ) -> Result<PublishedReference> {
        let path = self.config.checkout_path(name);

        if self.cache.get(&path).is_some() {
            let commit = RepositoryHandle::bind(self.git, self.config, name).resolve(revision)?;
            if let Some(published) = self.cache.lookup(&path, name, &commit)? {
                info!("{} already published as {}", name, published.revision);
                return Ok(published);
            }
        }

        self.cache.enter(&path)?;
        match self.publish_checkout(role, name, url, revision, &path) {
            Ok(record) => {
                let published = record.published.clone();
                self.cache
                    .complete(&path, &record.source_commit, published.clone());
                self.records.push(record);
                Ok(published)
            }
            Err(e) => {
                self.cache.leave(&path);
                Err(e)
            }
        }
    }

    fn publish_checkout(
        &mut self,
        role: Role,
        name: &str,
        url: &str,
        revision: &str,
        path: &Path,
    ) -> Result<PublicationRecord> {
        info!("Publish {} {} at {}", role, name, revision);
        let handle = RepositoryHandle::acquire(self.git, self.config, name, url, revision)?;
        let source_commit = handle.head_commit()?;

        let mut children = Vec::new();
        if let Some(strategy) = role.strategy() {
            let references = extract::extract(self.config, strategy, handle.path())?;
            let mut rewrites = Vec::with_capacity(references.len());
            for reference in references {
                let published = self.publish(
                    role.child_role(),
                    &reference.name,
                    &reference.url,
                    &reference.revision,
                )?;
                children.push(self.config.checkout_path(&reference.name));
                rewrites.push((reference, published));
            }
            for (old, new) in &rewrites {
                let changed = patch::apply(self.config, old, new)?;
                debug!("{} file(s) rewritten for {}", changed, old.name);
            }
        }

        if role == Role::Layer {
            self.purge(&handle)?;
        }

        if handle.is_dirty()? {
            match handle.commit_pending(role.intermediate_message(self.config)) {
                Ok(_) | Err(Error::NothingToCommit { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let published = handle.squash_onto_publication_branch(self.config, &self.message)?;
        Ok(PublicationRecord {
            role,
            name: name.to_string(),
            path: path.to_path_buf(),
            source_commit,
            published,
            children,
        })
    }

    /// Delete the files of a layer matched by its purge rules.
    fn purge(&self, handle: &RepositoryHandle<'_>) -> Result<()> {
        let rules = self
            .config
            .purge
            .iter()
            .filter(|rule| handle.name().contains(rule.layer.as_str()))
            .map(|rule| glob::Pattern::new(&rule.pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if rules.is_empty() {
            return Ok(());
        }

        let mut doomed = Vec::new();
        for entry in WalkDir::new(handle.path())
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
        {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(handle.path()) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if rules.iter().any(|rule| rule.matches(&relative)) {
                doomed.push(entry.path().to_path_buf());
            }
        }

        for file in doomed {
            info!("Purge {}", file.display());
            fs::remove_file(file)?;
        }
        Ok(())
    }

    /// Publication records in completion order, children before parents.
    pub fn records(&self) -> &[PublicationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PublicationRecord> {
        self.records
    }
}
