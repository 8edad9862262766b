//! # Repository Checkouts
//!
//! This module provides `RepositoryHandle`, a checkout bound to a directory
//! under the checkout root, and the `GitOperations` trait it drives.
//!
//! ## Design
//!
//! The handle holds the policy (reuse or clone, reset before and after
//! moving HEAD, where the publication commit gets its parent) while every
//! version-control primitive goes through `GitOperations`. In the binary,
//! `DefaultGitOperations` wraps the system `git` command; tests swap in an
//! in-memory implementation so that the publication logic can be exercised
//! without a `git` executable or network access.
//!
//! Checkouts are never removed: a later run finds the directory, fetches and
//! moves HEAD again, which makes `acquire` idempotent.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::PublicationConfig;
use crate::error::{Error, Result};
use crate::reference::{join_url, url_basename, PublishedReference};

/// Version-control primitives consumed by the publication engine.
pub trait GitOperations {
    /// Clones `url` into `target_dir`.
    fn clone(&self, url: &str, target_dir: &Path) -> Result<()>;

    /// Fetches branches and tags from `remote`.
    fn fetch(&self, repo: &Path, remote: &str) -> Result<()>;

    /// Resets index and working tree to HEAD.
    fn reset_hard(&self, repo: &Path) -> Result<()>;

    /// Resolves a commit hash, tag or ref expression to a commit hash.
    fn resolve_commit(&self, repo: &Path, revision: &str) -> Result<Option<String>>;

    /// Commit a tag points to.
    fn tag_commit(&self, repo: &Path, tag: &str) -> Result<Option<String>>;

    /// Detaches HEAD at `commit`.
    fn checkout_detached(&self, repo: &Path, commit: &str) -> Result<()>;

    fn head_commit(&self, repo: &Path) -> Result<String>;

    fn head_tree(&self, repo: &Path) -> Result<String>;

    /// True when tracked files differ from HEAD.
    fn is_dirty(&self, repo: &Path) -> Result<bool>;

    /// Repository-relative paths of tracked files that differ from HEAD.
    fn changed_files(&self, repo: &Path) -> Result<Vec<String>>;

    fn stage(&self, repo: &Path, file: &str) -> Result<()>;

    /// Commits the index, returning the new HEAD.
    fn commit(&self, repo: &Path, message: &str) -> Result<String>;

    fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>>;

    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;

    /// Tip of a local branch.
    fn branch_commit(&self, repo: &Path, branch: &str) -> Result<Option<String>>;

    /// Tip of a remote-tracking branch.
    fn remote_branch_commit(&self, repo: &Path, remote: &str, branch: &str)
        -> Result<Option<String>>;

    /// Creates a commit with the given tree and parents without touching any ref.
    fn commit_tree(&self, repo: &Path, tree: &str, parents: &[String], message: &str)
        -> Result<String>;

    fn set_branch(&self, repo: &Path, branch: &str, commit: &str) -> Result<()>;

    /// Makes HEAD follow `branch` and materializes its tree.
    fn attach_head(&self, repo: &Path, branch: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone(&self, url: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone(url, target_dir)
    }

    fn fetch(&self, repo: &Path, remote: &str) -> Result<()> {
        crate::git::fetch(repo, remote)
    }

    fn reset_hard(&self, repo: &Path) -> Result<()> {
        crate::git::reset_hard(repo)
    }

    fn resolve_commit(&self, repo: &Path, revision: &str) -> Result<Option<String>> {
        crate::git::resolve_commit(repo, revision)
    }

    fn tag_commit(&self, repo: &Path, tag: &str) -> Result<Option<String>> {
        crate::git::tag_commit(repo, tag)
    }

    fn checkout_detached(&self, repo: &Path, commit: &str) -> Result<()> {
        crate::git::checkout_detached(repo, commit)
    }

    fn head_commit(&self, repo: &Path) -> Result<String> {
        crate::git::head_commit(repo)
    }

    fn head_tree(&self, repo: &Path) -> Result<String> {
        crate::git::head_tree(repo)
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        crate::git::is_dirty(repo)
    }

    fn changed_files(&self, repo: &Path) -> Result<Vec<String>> {
        crate::git::changed_files(repo)
    }

    fn stage(&self, repo: &Path, file: &str) -> Result<()> {
        crate::git::stage(repo, file)
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<String> {
        crate::git::commit(repo, message)
    }

    fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        crate::git::remote_url(repo, remote)
    }

    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        crate::git::add_remote(repo, remote, url)
    }

    fn branch_commit(&self, repo: &Path, branch: &str) -> Result<Option<String>> {
        crate::git::branch_commit(repo, branch)
    }

    fn remote_branch_commit(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<Option<String>> {
        crate::git::remote_branch_commit(repo, remote, branch)
    }

    fn commit_tree(
        &self,
        repo: &Path,
        tree: &str,
        parents: &[String],
        message: &str,
    ) -> Result<String> {
        crate::git::commit_tree(repo, tree, parents, message)
    }

    fn set_branch(&self, repo: &Path, branch: &str, commit: &str) -> Result<()> {
        crate::git::set_branch(repo, branch, commit)
    }

    fn attach_head(&self, repo: &Path, branch: &str) -> Result<()> {
        crate::git::attach_head(repo, branch)
    }
}

/// Resolve a revision the way references spell it.
///
/// Tags win, then the freshly fetched `origin/<revision>` so that a branch
/// name never resolves to a stale local branch, then anything `git` accepts
/// (commit hashes in particular).
pub fn resolve_revision(
    git: &dyn GitOperations,
    repo: &Path,
    name: &str,
    revision: &str,
) -> Result<String> {
    let candidates = [
        format!("refs/tags/{}", revision),
        format!("refs/remotes/origin/{}", revision),
        revision.to_string(),
    ];
    for candidate in &candidates {
        if let Some(commit) = git.resolve_commit(repo, candidate)? {
            return Ok(commit);
        }
    }
    Err(Error::UnresolvableRevision {
        repository: name.to_string(),
        revision: revision.to_string(),
    })
}

/// A checkout owned by the current run.
pub struct RepositoryHandle<'g> {
    git: &'g dyn GitOperations,
    name: String,
    path: PathBuf,
}

impl<'g> RepositoryHandle<'g> {
    /// Clone the repository if its checkout is absent, otherwise fetch origin.
    ///
    /// HEAD is left where it was; see `acquire` to move it.
    pub fn open(
        git: &'g dyn GitOperations,
        config: &PublicationConfig,
        name: &str,
        url: &str,
    ) -> Result<Self> {
        let path = config.checkout_path(name);
        if !path.exists() {
            let clone_url = join_url(&config.clone_url(url), name);
            info!("Clone repository {} into {}", clone_url, path.display());
            git.clone(&clone_url, &path)?;
        } else {
            info!("Reuse checkout {}", path.display());
            git.fetch(&path, "origin")?;
        }
        Ok(Self {
            git,
            name: name.to_string(),
            path,
        })
    }

    /// Handle on a checkout this run already opened, without fetching again.
    pub fn bind(git: &'g dyn GitOperations, config: &PublicationConfig, name: &str) -> Self {
        Self {
            git,
            name: name.to_string(),
            path: config.checkout_path(name),
        }
    }

    /// Open the checkout and move HEAD to `revision`, discarding local changes.
    pub fn acquire(
        git: &'g dyn GitOperations,
        config: &PublicationConfig,
        name: &str,
        url: &str,
        revision: &str,
    ) -> Result<Self> {
        let handle = Self::open(git, config, name, url)?;
        handle.checkout(revision)?;
        Ok(handle)
    }

    /// Reset, detach HEAD at `revision` and reset again. Returns the commit.
    pub fn checkout(&self, revision: &str) -> Result<String> {
        self.git.reset_hard(&self.path)?;
        let commit = self.resolve(revision)?;
        info!("Checkout {} at {} ({})", self.name, revision, commit);
        self.git.checkout_detached(&self.path, &commit)?;
        self.git.reset_hard(&self.path)?;
        Ok(commit)
    }

    pub fn resolve(&self, revision: &str) -> Result<String> {
        resolve_revision(self.git, &self.path, &self.name, revision)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn head_commit(&self) -> Result<String> {
        self.git.head_commit(&self.path)
    }

    pub fn head_tree(&self) -> Result<String> {
        self.git.head_tree(&self.path)
    }

    pub fn is_dirty(&self) -> Result<bool> {
        self.git.is_dirty(&self.path)
    }

    /// Stage every changed tracked file and commit.
    ///
    /// Returns `NothingToCommit` when the working tree is clean.
    pub fn commit_pending(&self, message: &str) -> Result<String> {
        let files = self.git.changed_files(&self.path)?;
        if files.is_empty() {
            return Err(Error::NothingToCommit {
                repository: self.name.clone(),
            });
        }
        for file in &files {
            debug!("Stage {}", file);
            self.git.stage(&self.path, file)?;
        }
        let commit = self.git.commit(&self.path, message)?;
        info!("Commit {} on {}: {}", commit, self.name, message);
        Ok(commit)
    }

    /// Record the tree of HEAD as one new commit on the publication branch.
    ///
    /// The parent is the local publication branch when it exists, else the
    /// publication branch on origin unless `publication.restart` is set, else
    /// none. HEAD ends on the publication branch.
    pub fn squash_onto_publication_branch(
        &self,
        config: &PublicationConfig,
        message: &str,
    ) -> Result<PublishedReference> {
        let target = &config.publication;
        let origin_url = self
            .git
            .remote_url(&self.path, "origin")?
            .unwrap_or_else(|| self.name.clone());
        let name = url_basename(&origin_url).to_string();

        if self.git.remote_url(&self.path, &target.remote_name)?.is_none() {
            let push_url = join_url(&target.push_url, &name);
            debug!("Add remote {} -> {}", target.remote_name, push_url);
            self.git.add_remote(&self.path, &target.remote_name, &push_url)?;
        }

        let parents = match self.git.branch_commit(&self.path, &target.branch)? {
            Some(tip) => {
                debug!("Reuse local branch {} at {}", target.branch, tip);
                vec![tip]
            }
            None if target.restart => {
                debug!("Restart branch {} from a root commit", target.branch);
                Vec::new()
            }
            None => match self
                .git
                .remote_branch_commit(&self.path, "origin", &target.branch)?
            {
                Some(tip) => {
                    debug!("Continue origin/{} at {}", target.branch, tip);
                    vec![tip]
                }
                None => {
                    debug!("Create branch {} from a root commit", target.branch);
                    Vec::new()
                }
            },
        };

        self.git.reset_hard(&self.path)?;
        let tree = self.git.head_tree(&self.path)?;
        let commit = self
            .git
            .commit_tree(&self.path, &tree, &parents, message)?;
        self.git.set_branch(&self.path, &target.branch, &commit)?;
        self.git.attach_head(&self.path, &target.branch)?;
        info!("Commit created: {} ({}) in {}", target.branch, commit, self.name);

        Ok(PublishedReference {
            name,
            url: target.recipe_url.clone(),
            revision: commit,
            branch: target.branch.clone(),
        })
    }

    /// True when the local publication branch is not on the public remote yet.
    pub fn has_unpushed_publication(&self, config: &PublicationConfig) -> Result<bool> {
        let target = &config.publication;
        let local = self.git.branch_commit(&self.path, &target.branch)?;
        let pushed = self
            .git
            .remote_branch_commit(&self.path, &target.remote_name, &target.branch)?;
        Ok(local.is_some() && local != pushed)
    }
}
