//! # Repository References
//!
//! The records that flow through a publication run:
//!
//! - **`RepositoryReference`**: a repository and revision as cited by a text
//!   artifact (a manifest `project` element or a recipe), together with the
//!   files it was read from.
//! - **`PublishedReference`**: the public identity of a repository once its
//!   publication commit exists.
//!
//! A reference is read from text, drives one recursive publication, and is
//! then superseded by the published reference that replaces it in every file
//! listed in its provenance.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;

/// Where a reference was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceKind {
    /// A `project` element of the XML manifest.
    Manifest,
    /// A free-text build recipe.
    Recipe,
}

impl fmt::Display for ProvenanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenanceKind::Manifest => write!(f, "manifest"),
            ProvenanceKind::Recipe => write!(f, "recipe"),
        }
    }
}

/// The files a reference was found in, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub kind: ProvenanceKind,
    pub files: Vec<PathBuf>,
}

impl Provenance {
    pub fn new(kind: ProvenanceKind, file: PathBuf) -> Self {
        Self {
            kind,
            files: vec![file],
        }
    }
}

/// A repository and revision cited by a text artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    /// Remote base URL, without the repository name.
    pub url: String,
    /// Repository name as it appears in the URL (e.g. `libbar.git`).
    pub name: String,
    /// Branch, absent for manifest references which pin a revision only.
    pub branch: Option<String>,
    /// Commit hash or tag.
    pub revision: String,
    /// Manifest `path` attribute, when read from a manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub provenance: Provenance,
}

impl RepositoryReference {
    /// Identity of the reference; files citing the same key share one reference.
    pub fn key(&self) -> ReferenceKey {
        ReferenceKey {
            url: self.url.clone(),
            name: self.name.clone(),
            branch: self.branch.clone(),
            revision: self.revision.clone(),
        }
    }

    /// `url/name`, the address the reference was written with.
    pub fn full_url(&self) -> String {
        join_url(&self.url, &self.name)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_url())?;
        if let Some(branch) = &self.branch {
            write!(f, " {}", branch)?;
        }
        write!(f, " ({})", self.revision)
    }
}

/// Composite identity `url + name + branch + revision`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey {
    pub url: String,
    pub name: String,
    pub branch: Option<String>,
    pub revision: String,
}

/// Public identity of a repository after its publication commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedReference {
    pub name: String,
    /// Public base URL, without the repository name.
    pub url: String,
    /// The publication commit.
    pub revision: String,
    /// The publication branch.
    pub branch: String,
}

impl PublishedReference {
    pub fn full_url(&self) -> String {
        join_url(&self.url, &self.name)
    }
}

impl fmt::Display for PublishedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.full_url(), self.branch, self.revision)
    }
}

/// References as pretty-printed JSON, in the order given.
pub fn to_json(references: &[RepositoryReference]) -> Result<String> {
    Ok(serde_json::to_string_pretty(references)?)
}

/// Join a base URL and a repository name with exactly one slash.
pub fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Last path segment of a URL, ignoring a trailing slash.
pub fn url_basename(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed)
}
