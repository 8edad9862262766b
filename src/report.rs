//! Summary of a publication run.
//!
//! Pushing is left to the operator. The report lists what was published,
//! which checkouts hold publication commits the public remote has not seen,
//! and the commands that push them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ptree::TreeItem;
use serde::Serialize;

use crate::config::PublicationConfig;
use crate::engine::PublicationRecord;
use crate::error::Result;
use crate::reference::PublishedReference;

#[derive(Debug, Clone, Serialize)]
pub struct PublicationReport {
    /// Tag of the manifest repository the run started from.
    pub tag: String,
    pub root: PublishedReference,
    /// Every published repository, children before parents.
    pub records: Vec<PublicationRecord>,
    /// Checkouts whose publication branch is ahead of the public remote.
    pub unpushed: Vec<PathBuf>,
    pub push_commands: Vec<String>,
}

impl PublicationReport {
    pub fn new(
        config: &PublicationConfig,
        tag: &str,
        root: PublishedReference,
        records: Vec<PublicationRecord>,
        unpushed: Vec<PathBuf>,
    ) -> Self {
        let push_commands = push_commands(config, &unpushed);
        Self {
            tag: tag.to_string(),
            root,
            records,
            unpushed,
            push_commands,
        }
    }

    fn record(&self, path: &Path) -> Option<&PublicationRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// The publication graph rooted at the manifest repository.
    pub fn tree(&self) -> ReportNode {
        let children: HashMap<&Path, &PublicationRecord> =
            self.records.iter().map(|r| (r.path.as_path(), r)).collect();
        match self.records.last() {
            Some(root) => build_node(root, &children, &mut Vec::new()),
            None => ReportNode {
                label: self.root.to_string(),
                children: Vec::new(),
            },
        }
    }

    /// `tree()` rendered as text.
    pub fn render_tree(&self) -> Result<String> {
        let mut buffer = Vec::new();
        ptree::write_tree(&self.tree(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Publication commit of the repository checked out at `path`.
    pub fn published_at(&self, path: &Path) -> Option<&PublishedReference> {
        self.record(path).map(|r| &r.published)
    }
}

/// Shell commands pushing the publication branch of each checkout to the
/// public remote, then to origin.
pub fn push_commands(config: &PublicationConfig, paths: &[PathBuf]) -> Vec<String> {
    let target = &config.publication;
    let mut commands = Vec::with_capacity(paths.len() * 2);
    for remote in [target.remote_name.as_str(), "origin"] {
        for path in paths {
            commands.push(format!(
                "git -C {} push {} {}",
                path.display(),
                remote,
                target.branch
            ));
        }
    }
    commands
}

fn build_node(
    record: &PublicationRecord,
    records: &HashMap<&Path, &PublicationRecord>,
    ancestors: &mut Vec<PathBuf>,
) -> ReportNode {
    let label = format!(
        "{} [{}] {} -> {}",
        record.name, record.role, record.source_commit, record.published.revision
    );
    ancestors.push(record.path.clone());
    let mut children = Vec::with_capacity(record.children.len());
    for child in &record.children {
        if ancestors.contains(child) {
            continue;
        }
        if let Some(child) = records.get(child.as_path()) {
            children.push(build_node(child, records, ancestors));
        }
    }
    ancestors.pop();
    ReportNode { label, children }
}

/// Tree node for ptree rendering.
#[derive(Debug, Clone)]
pub struct ReportNode {
    pub label: String,
    pub children: Vec<ReportNode>,
}

impl TreeItem for ReportNode {
    type Child = ReportNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
