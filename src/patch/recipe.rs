//! Rewriting a reference inside a build recipe.
//!
//! Three substitutions, each keyed on the old value so that unrelated text
//! stays untouched:
//!
//! - the old `url/name` and its `;key=value` parameters become the public
//!   `url/name`, with the internal transport parameter dropped and a
//!   `branch=` parameter carrying the old branch moved to the new one
//! - the old revision becomes the publication commit
//! - a branch assignment whose value holds the old branch becomes
//!   `KEY = "<publication branch>"`

use std::fs;
use std::path::Path;

use log::{debug, info};
use regex::{Captures, NoExpand, Regex};

use crate::config::PublicationConfig;
use crate::error::Result;
use crate::extract::recipe::ASSIGNMENT_OPERATORS;
use crate::reference::{PublishedReference, RepositoryReference};

/// Substitutions for one (old, new) pair, compiled once and applied to every
/// provenance file.
///
/// All three substitutions are alternatives of a single pattern, so each one
/// only ever sees text of the original file.
pub struct RecipePatch {
    pattern: Regex,
    revision: Option<Regex>,
    transport_suffix: String,
    old_branch: Option<String>,
    new_url: String,
    new_revision: String,
    new_branch: String,
}

impl RecipePatch {
    pub fn new(
        config: &PublicationConfig,
        old: &RepositoryReference,
        new: &PublishedReference,
    ) -> Result<Self> {
        let mut alternatives = Vec::new();

        let old_branch = old.branch.as_deref().filter(|b| !b.is_empty());
        let keys = config
            .recipe
            .branch_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>();
        if let (Some(old_branch), false) = (old_branch, keys.is_empty()) {
            alternatives.push(format!(
                r"(?P<branch>^(?P<key>{})[ \t]*{}[^\r\n]*{}[^\r\n]*$)",
                keys.join("|"),
                ASSIGNMENT_OPERATORS,
                regex::escape(old_branch)
            ));
        }

        alternatives.push(format!(
            r#"(?P<url>{}/?(?P<params>(?:;[^;\s"'\\]*)*)(?P<end>[^A-Za-z0-9._\-/]|$))"#,
            regex::escape(&old.full_url())
        ));

        let revision = if old.revision.is_empty() {
            None
        } else {
            alternatives.push(format!("(?P<revision>{})", regex::escape(&old.revision)));
            Some(Regex::new(&format!("(?i){}", regex::escape(&old.revision)))?)
        };

        let pattern = Regex::new(&format!("(?mi){}", alternatives.join("|")))?;
        Ok(Self {
            pattern,
            revision,
            transport_suffix: config.recipe.transport_suffix.clone(),
            old_branch: old.branch.clone(),
            new_url: new.full_url(),
            new_revision: new.revision.clone(),
            new_branch: new.branch.clone(),
        })
    }

    /// `;key=value` chain with the transport dropped, the branch moved and
    /// the revision replaced.
    fn rewrite_params(&self, params: &str) -> String {
        let suffix = self.transport_suffix.trim_start_matches(';');
        let mut kept = String::new();
        for param in params.split(';').filter(|p| !p.is_empty()) {
            if !suffix.is_empty() && param.eq_ignore_ascii_case(suffix) {
                continue;
            }
            kept.push(';');
            match (param.split_once('='), self.old_branch.as_deref()) {
                (Some((key, value)), Some(old_branch))
                    if key.eq_ignore_ascii_case("branch") && value == old_branch =>
                {
                    kept.push_str(key);
                    kept.push('=');
                    kept.push_str(&self.new_branch);
                }
                _ => match &self.revision {
                    Some(revision) => {
                        kept.push_str(&revision.replace_all(param, NoExpand(&self.new_revision)))
                    }
                    None => kept.push_str(param),
                },
            }
        }
        kept
    }

    /// Apply every substitution to `content`.
    pub fn patch_text(&self, content: &str) -> String {
        self.pattern
            .replace_all(content, |caps: &Captures| {
                if caps.name("branch").is_some() {
                    format!("{} = \"{}\"", &caps["key"], self.new_branch)
                } else if caps.name("url").is_some() {
                    format!(
                        "{}{}{}",
                        self.new_url,
                        self.rewrite_params(&caps["params"]),
                        &caps["end"]
                    )
                } else {
                    self.new_revision.clone()
                }
            })
            .into_owned()
    }

    /// Patch one file in place. Returns whether it changed.
    pub fn apply(&self, file: &Path) -> Result<bool> {
        let content = fs::read_to_string(file)?;
        let patched = self.patch_text(&content);
        if patched == content {
            debug!("Nothing to rewrite in {}", file.display());
            return Ok(false);
        }
        fs::write(file, patched)?;
        info!("Rewrote {}", file.display());
        Ok(true)
    }
}
