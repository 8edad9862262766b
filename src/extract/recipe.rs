//! Reading references out of build recipes.
//!
//! A recipe cites an internal repository with a URL on one of the internal
//! hosts, pins it with a revision variable (`SRCREV`) and names its branch
//! with one of the branch variables (`SRCBRANCH`, then `BRANCH`). Each field
//! must have exactly one distinct value per file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use regex::Regex;
use walkdir::WalkDir;

use crate::config::PublicationConfig;
use crate::error::{Error, Result};
use crate::reference::{url_basename, Provenance, ProvenanceKind, ReferenceKey, RepositoryReference};

/// BitBake assignment operators, longest first.
pub(crate) const ASSIGNMENT_OPERATORS: &str = r"(?:\?\?=|\?=|:=|\+=|=\+|\.=|=\.|=)";

/// Regex matching an assignment of `key`, capturing the value.
pub(crate) fn assignment_pattern(key: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"(?m)^{}[ \t]*{}[ \t]*(.*?)[ \t]*$",
        regex::escape(key),
        ASSIGNMENT_OPERATORS
    ))?)
}

/// Regex matching any URL whose authority starts with one of `hosts`.
pub(crate) fn internal_url_pattern(hosts: &[String]) -> Result<Regex> {
    let alternatives = hosts
        .iter()
        .filter(|h| !h.trim().is_empty())
        .map(|h| regex::escape(h.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&format!(
        r#"[A-Za-z][A-Za-z0-9+.\-]*://(?:{})[^;\s"'\\]*"#,
        alternatives
    ))?)
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    value.to_string()
}

fn distinct<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Scans a layer checkout for references to internal repositories.
pub struct RecipeScanner {
    hosts: Vec<String>,
    url: Regex,
    revision_key: String,
    revision: Regex,
    branches: Vec<(String, Regex)>,
    skip: Vec<String>,
}

impl RecipeScanner {
    pub fn new(config: &PublicationConfig) -> Result<Self> {
        let recipe = &config.recipe;
        let branches = recipe
            .branch_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| Ok((k.clone(), assignment_pattern(k)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            hosts: config
                .internal_hosts
                .iter()
                .filter(|h| !h.trim().is_empty())
                .map(|h| h.trim().to_string())
                .collect(),
            url: internal_url_pattern(&config.internal_hosts)?,
            revision_key: recipe.revision_key.clone(),
            revision: assignment_pattern(&recipe.revision_key)?,
            branches,
            skip: recipe.skip.clone(),
        })
    }

    /// Files under `repo_root` mentioning an internal host, with their content.
    fn candidate_files(&self, repo_root: &Path) -> Result<Vec<(PathBuf, String)>> {
        let mut candidates = Vec::new();
        for entry in WalkDir::new(repo_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
        {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            let content = String::from_utf8_lossy(&bytes);
            if self.hosts.iter().any(|h| content.contains(h.as_str())) {
                candidates.push((entry.path().to_path_buf(), content.into_owned()));
            }
        }
        Ok(candidates)
    }

    /// Every distinct reference in the checkout, files citing the same one merged.
    pub fn scan(&self, repo_root: &Path) -> Result<Vec<RepositoryReference>> {
        debug!("Search linked repositories in {}", repo_root.display());
        let candidates = self.candidate_files(repo_root)?;
        if !candidates.is_empty() {
            info!("Recipes using internal repositories:");
            for (file, _) in &candidates {
                info!("  {}", file.display());
            }
        }

        let mut references: Vec<RepositoryReference> = Vec::new();
        let mut index: HashMap<ReferenceKey, usize> = HashMap::new();
        for (file, content) in candidates {
            let relative = file.strip_prefix(repo_root).unwrap_or(&file);
            let relative = relative.to_string_lossy();
            if let Some(skip) = self.skip.iter().find(|s| relative.contains(s.as_str())) {
                info!("Ignoring file {} (matches '{}')", file.display(), skip);
                continue;
            }

            let reference = self.extract_file(&file, &content)?;
            debug!("Reference in {}: {}", file.display(), reference);
            match index.get(&reference.key()) {
                Some(&position) => references[position].provenance.files.push(file),
                None => {
                    index.insert(reference.key(), references.len());
                    references.push(reference);
                }
            }
        }

        if references.is_empty() {
            info!("No repository reference found");
        } else {
            info!("References found:");
            for reference in &references {
                info!("  {}", reference);
            }
        }
        Ok(references)
    }

    /// The single reference cited by one recipe.
    pub fn extract_file(&self, file: &Path, content: &str) -> Result<RepositoryReference> {
        let urls = distinct(
            self.url
                .find_iter(content)
                .map(|m| m.as_str().trim_end_matches('/').to_string()),
        );
        let full_url = single(file, "internal URL", urls)?;

        let revisions = distinct(
            self.revision
                .captures_iter(content)
                .map(|c| unquote(&c[1])),
        );
        let revision = single(file, &self.revision_key, revisions)?;

        let branch = self.extract_branch(file, content)?;

        let name = url_basename(&full_url).to_string();
        let url = full_url
            .strip_suffix(name.as_str())
            .map(|base| base.trim_end_matches('/'))
            .unwrap_or(&full_url)
            .to_string();

        Ok(RepositoryReference {
            url,
            name,
            branch: Some(branch),
            revision,
            path: None,
            provenance: Provenance::new(ProvenanceKind::Recipe, file.to_path_buf()),
        })
    }

    fn extract_branch(&self, file: &Path, content: &str) -> Result<String> {
        for (key, pattern) in &self.branches {
            let values = distinct(pattern.captures_iter(content).map(|c| unquote(&c[1])));
            if !values.is_empty() {
                return single(file, key, values);
            }
        }
        let keys = self
            .branches
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(Error::MissingReferenceField {
            file: file.to_path_buf(),
            field: keys,
        })
    }
}

/// Exactly one candidate, or the error naming what was found.
fn single(file: &Path, field: &str, mut values: Vec<String>) -> Result<String> {
    match values.len() {
        0 => Err(Error::MissingReferenceField {
            file: file.to_path_buf(),
            field: field.to_string(),
        }),
        1 => Ok(values.remove(0)),
        _ => Err(Error::AmbiguousReference {
            file: file.to_path_buf(),
            field: field.to_string(),
            candidates: values,
        }),
    }
}
