//! Reading and writing the XML manifest.
//!
//! The manifest declares `remote` elements with a `fetch` base URL and
//! `project` elements bound to a remote by name. Only projects bound to the
//! configured internal remote are references. The document is held as an
//! `xot` tree so that rewriting touches attributes only.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use xot::{NameId, Node, Xot};

use crate::config::PublicationConfig;
use crate::error::{Error, Result};
use crate::reference::{Provenance, ProvenanceKind, RepositoryReference};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

struct Names {
    remote: NameId,
    project: NameId,
    name: NameId,
    fetch: NameId,
    revision: NameId,
    path: NameId,
}

/// A `project` element as declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    pub name: Option<String>,
    pub path: Option<String>,
    pub revision: Option<String>,
}

/// A parsed manifest bound to the file it came from.
pub struct ManifestDocument {
    file: PathBuf,
    xot: Xot,
    document: Node,
    names: Names,
    declaration: bool,
    trailing_newline: bool,
}

impl ManifestDocument {
    pub fn parse(file: &Path, content: &str) -> Result<Self> {
        let mut xot = Xot::new();
        let document = xot.parse(content).map_err(|e| Error::Manifest {
            file: file.to_path_buf(),
            message: e.to_string(),
        })?;
        let names = Names {
            remote: xot.add_name("remote"),
            project: xot.add_name("project"),
            name: xot.add_name("name"),
            fetch: xot.add_name("fetch"),
            revision: xot.add_name("revision"),
            path: xot.add_name("path"),
        };
        Ok(Self {
            file: file.to_path_buf(),
            xot,
            document,
            names,
            declaration: content.trim_start().starts_with("<?xml"),
            trailing_newline: content.ends_with('\n'),
        })
    }

    pub fn load(file: &Path) -> Result<Self> {
        let content = fs::read_to_string(file)?;
        Self::parse(file, &content)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    fn root_element(&self) -> Option<Node> {
        self.xot
            .children(self.document)
            .find(|node| self.xot.is_element(*node))
    }

    fn top_level(&self, element: NameId) -> Vec<Node> {
        let Some(root) = self.root_element() else {
            return Vec::new();
        };
        self.xot
            .children(root)
            .filter(|node| {
                self.xot
                    .element(*node)
                    .is_some_and(|e| e.name() == element)
            })
            .collect()
    }

    fn attribute(&self, node: Node, name: NameId) -> Option<String> {
        self.xot
            .attributes(node)
            .get(name)
            .map(|value| value.to_string())
    }

    fn find_remote(&self, remote: &str) -> Option<Node> {
        self.top_level(self.names.remote)
            .into_iter()
            .find(|node| self.attribute(*node, self.names.name).as_deref() == Some(remote))
    }

    /// `fetch` attribute of the `remote` element called `remote`.
    pub fn remote_fetch(&self, remote: &str) -> Option<String> {
        self.find_remote(remote)
            .and_then(|node| self.attribute(node, self.names.fetch))
    }

    /// Projects bound to `remote`, in document order.
    pub fn projects_on(&self, remote: &str) -> Vec<ProjectEntry> {
        self.top_level(self.names.project)
            .into_iter()
            .filter(|node| self.attribute(*node, self.names.remote).as_deref() == Some(remote))
            .map(|node| ProjectEntry {
                name: self.attribute(node, self.names.name),
                path: self.attribute(node, self.names.path),
                revision: self.attribute(node, self.names.revision),
            })
            .collect()
    }

    /// Replace the `fetch` URL of `remote`. Returns false if it is not declared.
    pub fn set_remote_fetch(&mut self, remote: &str, url: &str) -> bool {
        match self.find_remote(remote) {
            Some(node) => {
                let fetch = self.names.fetch;
                self.xot
                    .attributes_mut(node)
                    .insert(fetch, url.to_string());
                true
            }
            None => false,
        }
    }

    /// Set `revision` on every project called `name`. Returns how many changed.
    pub fn set_project_revision(&mut self, name: &str, revision: &str) -> usize {
        let targets: Vec<Node> = self
            .top_level(self.names.project)
            .into_iter()
            .filter(|node| self.attribute(*node, self.names.name).as_deref() == Some(name))
            .collect();
        let attribute = self.names.revision;
        for node in &targets {
            self.xot
                .attributes_mut(*node)
                .insert(attribute, revision.to_string());
        }
        targets.len()
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut body = self
            .xot
            .to_string(self.document)
            .map_err(|e| Error::Manifest {
                file: self.file.clone(),
                message: e.to_string(),
            })?;
        if self.declaration && !body.trim_start().starts_with("<?xml") {
            body = format!("{}\n{}", XML_DECLARATION, body);
        }
        if self.trailing_newline && !body.ends_with('\n') {
            body.push('\n');
        }
        Ok(body)
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.file, self.to_xml()?)?;
        Ok(())
    }
}

/// References to every project of the internal remote declared in the manifest.
pub fn extract(config: &PublicationConfig, repo_root: &Path) -> Result<Vec<RepositoryReference>> {
    let file = repo_root.join(&config.manifest.file);
    info!("Search layers in manifest {}", file.display());
    let document = ManifestDocument::load(&file)?;
    let remote = &config.manifest.remote;

    let projects = document.projects_on(remote);
    if projects.is_empty() {
        warn!("No project bound to remote '{}' in {}", remote, file.display());
        return Ok(Vec::new());
    }

    let fetch = document
        .remote_fetch(remote)
        .ok_or_else(|| Error::MissingReferenceField {
            file: file.clone(),
            field: format!("fetch URL of remote '{}'", remote),
        })?;
    debug!("Remote {} fetches from {}", remote, fetch);

    let mut references = Vec::with_capacity(projects.len());
    for project in projects {
        let name = project.name.ok_or_else(|| Error::MissingReferenceField {
            file: file.clone(),
            field: "project name".to_string(),
        })?;
        let revision = project
            .revision
            .ok_or_else(|| Error::MissingReferenceField {
                file: file.clone(),
                field: format!("revision of project '{}'", name),
            })?;
        references.push(RepositoryReference {
            url: fetch.clone(),
            name,
            branch: None,
            revision,
            path: project.path,
            provenance: Provenance::new(ProvenanceKind::Manifest, file.clone()),
        });
    }

    info!("Layers found:");
    for reference in &references {
        info!("  {}", reference);
    }
    Ok(references)
}
