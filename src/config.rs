//! # Publication Configuration
//!
//! This module defines `PublicationConfig`, the single value that carries every
//! setting of a publication run: where the root manifest lives, which hosts
//! count as internal, what the public coordinates look like and whether an
//! existing public branch is continued or restarted. It is loaded from a YAML
//! file and passed by reference to every component.
//!
//! ## Example
//!
//! ```yaml
//! manifest:
//!   name: platform.git
//!   url: ssh://git@stash.internal:7999/fcfw
//!   remote: internal
//! internal_hosts:
//!   - git@stash.internal
//! publication:
//!   branch: github_publication_SC4200
//!   push_url: git@github.com:Org-SC4200
//!   manifest_url: https://github.com/Org-SC4200
//!   recipe_url: git://github.com/Org-SC4200
//! ```
//!
//! Every other key has a default (see `defaults`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// The root manifest repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSource {
    /// Repository name, appended to `url` to clone and used as checkout directory.
    pub name: String,
    /// Internal base URL the manifest repository is cloned from.
    pub url: String,
    /// Manifest file inside the repository.
    #[serde(default = "default_manifest_file")]
    pub file: String,
    /// Name of the `remote` element whose projects are published.
    pub remote: String,
}

/// A prefix rewrite applied to reference URLs before cloning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRewrite {
    pub from: String,
    pub to: String,
}

/// Public coordinates and the publication branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationTarget {
    #[serde(default = "default_publication_branch")]
    pub branch: String,
    #[serde(default = "default_remote_name")]
    pub remote_name: String,
    /// Base URL of the public remote added to each checkout (push side).
    pub push_url: String,
    /// Base URL written into the manifest `remote` element.
    pub manifest_url: String,
    /// Base URL written into recipes.
    pub recipe_url: String,
    /// Ignore an existing publication branch on origin and start from a root commit.
    #[serde(default)]
    pub restart: bool,
}

/// How references are read from and written to recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSettings {
    #[serde(default = "default_revision_key")]
    pub revision_key: String,
    #[serde(default = "defaults::branch_keys")]
    pub branch_keys: Vec<String>,
    #[serde(default = "default_transport_suffix")]
    pub transport_suffix: String,
    /// Files whose path contains one of these substrings are not scanned.
    #[serde(default)]
    pub skip: Vec<String>,
}

impl Default for RecipeSettings {
    fn default() -> Self {
        Self {
            revision_key: default_revision_key(),
            branch_keys: defaults::branch_keys(),
            transport_suffix: default_transport_suffix(),
            skip: Vec::new(),
        }
    }
}

/// Files removed from a layer before its intermediate commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeRule {
    /// Substring of the layer name the rule applies to.
    pub layer: String,
    /// Glob matched against repository-relative paths.
    pub pattern: String,
}

/// Commit messages of the intermediate commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "default_manifest_message")]
    pub manifest_intermediate: String,
    #[serde(default = "default_layer_message")]
    pub layer_intermediate: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            manifest_intermediate: default_manifest_message(),
            layer_intermediate: default_layer_message(),
        }
    }
}

/// Everything a publication run needs to know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationConfig {
    pub manifest: ManifestSource,
    pub internal_hosts: Vec<String>,
    #[serde(default = "default_clone_url_rewrites")]
    pub clone_url_rewrites: Vec<UrlRewrite>,
    pub publication: PublicationTarget,
    #[serde(default)]
    pub recipe: RecipeSettings,
    #[serde(default)]
    pub purge: Vec<PurgeRule>,
    #[serde(default)]
    pub messages: Messages,
    #[serde(default = "defaults::checkout_root")]
    pub checkout_root: PathBuf,
}

fn default_manifest_file() -> String {
    defaults::MANIFEST_FILE.to_string()
}

fn default_publication_branch() -> String {
    defaults::PUBLICATION_BRANCH.to_string()
}

fn default_remote_name() -> String {
    defaults::PUBLIC_REMOTE_NAME.to_string()
}

fn default_revision_key() -> String {
    defaults::REVISION_KEY.to_string()
}

fn default_transport_suffix() -> String {
    defaults::TRANSPORT_SUFFIX.to_string()
}

fn default_manifest_message() -> String {
    defaults::MANIFEST_INTERMEDIATE_MESSAGE.to_string()
}

fn default_layer_message() -> String {
    defaults::LAYER_INTERMEDIATE_MESSAGE.to_string()
}

fn default_clone_url_rewrites() -> Vec<UrlRewrite> {
    vec![UrlRewrite {
        from: "git://".to_string(),
        to: "ssh://".to_string(),
    }]
}

impl PublicationConfig {
    /// Directory a repository is checked out into.
    pub fn checkout_path(&self, name: &str) -> PathBuf {
        self.checkout_root.join(name)
    }

    /// Apply the first matching prefix rewrite to `url`.
    pub fn clone_url(&self, url: &str) -> String {
        for rewrite in &self.clone_url_rewrites {
            if let Some(rest) = url.strip_prefix(&rewrite.from) {
                return format!("{}{}", rewrite.to, rest);
            }
        }
        url.to_string()
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("manifest.name", &self.manifest.name),
            ("manifest.url", &self.manifest.url),
            ("manifest.file", &self.manifest.file),
            ("manifest.remote", &self.manifest.remote),
            ("publication.branch", &self.publication.branch),
            ("publication.remote_name", &self.publication.remote_name),
            ("publication.push_url", &self.publication.push_url),
            ("publication.manifest_url", &self.publication.manifest_url),
            ("publication.recipe_url", &self.publication.recipe_url),
            ("recipe.revision_key", &self.recipe.revision_key),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("{} must not be empty", key),
                    hint: None,
                });
            }
        }

        if self.internal_hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(Error::ConfigParse {
                message: "internal_hosts is empty".to_string(),
                hint: Some(
                    "List the host identifiers that mark internal URLs, e.g. 'git@stash.example.com'"
                        .to_string(),
                ),
            });
        }

        if self.recipe.branch_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(Error::ConfigParse {
                message: "recipe.branch_keys is empty".to_string(),
                hint: Some("The default is [SRCBRANCH, BRANCH]".to_string()),
            });
        }

        for rule in &self.purge {
            glob::Pattern::new(&rule.pattern)?;
        }

        Ok(())
    }
}

/// Parse and validate a configuration from YAML text.
pub fn parse(yaml: &str) -> Result<PublicationConfig> {
    let config: PublicationConfig = serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some("See the example at the top of the config module documentation".to_string()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a configuration file.
pub fn from_file(path: &Path) -> Result<PublicationConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}
