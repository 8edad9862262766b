//! In-process memo of published repositories

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::reference::PublishedReference;

/// A repository already published in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Commit the publication was built from.
    pub source_commit: String,
    pub published: PublishedReference,
}

/// Published references keyed by checkout path, plus the checkouts whose
/// publication is still in progress.
#[derive(Debug, Default)]
pub struct PublicationCache {
    entries: HashMap<PathBuf, CacheEntry>,
    in_progress: Vec<PathBuf>,
    in_progress_set: HashSet<PathBuf>,
}

impl PublicationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The published reference for `path` when it was built from `commit`.
    ///
    /// The same checkout requested at another commit is a `ConflictingRevision`:
    /// a repository gets one publication commit per run.
    pub fn lookup(&self, path: &Path, name: &str, commit: &str) -> Result<Option<PublishedReference>> {
        match self.entries.get(path) {
            Some(entry) if entry.source_commit == commit => Ok(Some(entry.published.clone())),
            Some(entry) => Err(Error::ConflictingRevision {
                repository: name.to_string(),
                published: entry.source_commit.clone(),
                requested: commit.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Mark `path` as being published. Fails if it already is, which means a
    /// repository reaches itself through its references.
    pub fn enter(&mut self, path: &Path) -> Result<()> {
        if self.in_progress_set.contains(path) {
            let start = self
                .in_progress
                .iter()
                .position(|p| p == path)
                .unwrap_or(0);
            let cycle = self.in_progress[start..]
                .iter()
                .map(|p| display_name(p))
                .chain(std::iter::once(display_name(path)))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Error::CycleDetected { cycle });
        }
        self.in_progress.push(path.to_path_buf());
        self.in_progress_set.insert(path.to_path_buf());
        Ok(())
    }

    /// Record the publication of `path` and clear its in-progress mark.
    pub fn complete(&mut self, path: &Path, source_commit: &str, published: PublishedReference) {
        self.leave(path);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                source_commit: source_commit.to_string(),
                published,
            },
        );
    }

    /// Clear the in-progress mark of `path` without recording anything.
    pub fn leave(&mut self, path: &Path) {
        if self.in_progress_set.remove(path) {
            if let Some(position) = self.in_progress.iter().rposition(|p| p == path) {
                self.in_progress.remove(position);
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
