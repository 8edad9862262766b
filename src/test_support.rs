//! Test doubles shared by the unit tests.
//!
//! `FakeGit` keeps commits, trees and refs in memory but writes working trees
//! to real directories, so extraction and patching run against actual files.
//! Tree ids are content hashes: two commits with the same files share a tree.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{
    ManifestSource, Messages, PublicationConfig, PublicationTarget, RecipeSettings, UrlRewrite,
};
use crate::error::{Error, Result};
use crate::repository::GitOperations;

pub(crate) const INTERNAL_HOST: &str = "internal.host";

/// Configuration pointing every checkout below `root`.
pub(crate) fn test_config(root: &Path) -> PublicationConfig {
    PublicationConfig {
        manifest: ManifestSource {
            name: "platform.git".to_string(),
            url: "ssh://internal.host/base".to_string(),
            file: "default.xml".to_string(),
            remote: "internal".to_string(),
        },
        internal_hosts: vec![INTERNAL_HOST.to_string()],
        clone_url_rewrites: vec![UrlRewrite {
            from: "git://".to_string(),
            to: "ssh://".to_string(),
        }],
        publication: PublicationTarget {
            branch: "github_publication_X".to_string(),
            remote_name: "github".to_string(),
            push_url: "git@github.com:Org".to_string(),
            manifest_url: "https://github.com/Org".to_string(),
            recipe_url: "git://github.com/Org".to_string(),
            restart: false,
        },
        recipe: RecipeSettings::default(),
        purge: Vec::new(),
        messages: Messages::default(),
        checkout_root: root.join("repo"),
    }
}

type Files = BTreeMap<String, String>;

struct CommitObject {
    tree: String,
    parents: Vec<String>,
    message: String,
}

#[derive(Default)]
struct RemoteRepository {
    branches: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
}

enum Head {
    Detached(String),
    Branch(String),
}

struct Checkout {
    origin: String,
    remotes: BTreeMap<String, String>,
    branches: BTreeMap<String, String>,
    remote_branches: BTreeMap<(String, String), String>,
    tags: BTreeMap<String, String>,
    head: Head,
    staged: BTreeSet<String>,
}

#[derive(Default)]
struct State {
    remotes: HashMap<String, RemoteRepository>,
    checkouts: HashMap<PathBuf, Checkout>,
    commits: HashMap<String, CommitObject>,
    trees: HashMap<String, Files>,
    next_id: u64,
    clones: usize,
    fetches: usize,
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl State {
    fn store_tree(&mut self, files: Files) -> String {
        let id = format!("{:016x}", hash_of(&files));
        self.trees.insert(id.clone(), files);
        id
    }

    fn store_commit(&mut self, tree: &str, parents: &[String], message: &str) -> String {
        self.next_id += 1;
        let seed = hash_of(&(self.next_id, tree, parents, message));
        let id = format!("{:016x}{:016x}{:08x}", seed, hash_of(&seed), self.next_id);
        self.commits.insert(
            id.clone(),
            CommitObject {
                tree: tree.to_string(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        id
    }

    fn checkout(&self, repo: &Path) -> Result<&Checkout> {
        self.checkouts.get(repo).ok_or_else(|| not_a_repository(repo))
    }

    fn checkout_mut(&mut self, repo: &Path) -> Result<&mut Checkout> {
        self.checkouts
            .get_mut(repo)
            .ok_or_else(|| not_a_repository(repo))
    }

    fn head_commit(&self, repo: &Path) -> Result<String> {
        let checkout = self.checkout(repo)?;
        match &checkout.head {
            Head::Detached(commit) => Ok(commit.clone()),
            Head::Branch(branch) => checkout
                .branches
                .get(branch)
                .cloned()
                .ok_or_else(|| git_error(repo, "rev-parse HEAD", "unborn branch")),
        }
    }

    fn tree_of(&self, commit: &str) -> Files {
        self.commits
            .get(commit)
            .and_then(|c| self.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default()
    }

    fn resolve(&self, repo: &Path, revision: &str) -> Result<Option<String>> {
        let checkout = self.checkout(repo)?;
        if self.commits.contains_key(revision) {
            return Ok(Some(revision.to_string()));
        }
        if let Some(branch) = revision.strip_prefix("refs/heads/") {
            return Ok(checkout.branches.get(branch).cloned());
        }
        if let Some(tag) = revision.strip_prefix("refs/tags/") {
            return Ok(checkout.tags.get(tag).cloned());
        }
        if let Some(rest) = revision.strip_prefix("refs/remotes/") {
            return Ok(split_remote(rest)
                .and_then(|key| checkout.remote_branches.get(&key).cloned()));
        }
        if let Some(commit) = checkout.tags.get(revision) {
            return Ok(Some(commit.clone()));
        }
        if let Some(commit) = checkout.branches.get(revision) {
            return Ok(Some(commit.clone()));
        }
        Ok(split_remote(revision).and_then(|key| checkout.remote_branches.get(&key).cloned()))
    }
}

fn split_remote(tracking: &str) -> Option<(String, String)> {
    tracking
        .split_once('/')
        .map(|(remote, branch)| (remote.to_string(), branch.to_string()))
}

fn not_a_repository(repo: &Path) -> Error {
    git_error(repo, "status", "not a git repository")
}

fn git_error(repo: &Path, command: &str, stderr: &str) -> Error {
    Error::GitCommand {
        command: command.to_string(),
        repository: repo.display().to_string(),
        stderr: stderr.to_string(),
    }
}

fn read_working_tree(repo: &Path) -> Result<Files> {
    let mut files = Files::new();
    for entry in WalkDir::new(repo)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(repo)
                .map_err(|e| git_error(repo, "status", &e.to_string()))?;
            let content = fs::read_to_string(entry.path())?;
            files.insert(relative.to_string_lossy().replace('\\', "/"), content);
        }
    }
    Ok(files)
}

fn write_files(repo: &Path, files: &Files) -> Result<()> {
    for (path, content) in files {
        let full = repo.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, content)?;
    }
    Ok(())
}

fn to_files(entries: &[(&str, &str)]) -> Files {
    entries
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect()
}

/// In-memory `GitOperations`.
#[derive(Default)]
pub(crate) struct FakeGit {
    state: RefCell<State>,
}

impl FakeGit {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a remote repository whose `main` branch holds `files`.
    pub(crate) fn add_remote_repository(&self, url: &str, files: &[(&str, &str)]) -> String {
        let mut state = self.state.borrow_mut();
        let root_tree = state.store_tree(Files::new());
        let root = state.store_commit(&root_tree, &[], "Initial internal commit");
        let tree = state.store_tree(to_files(files));
        let commit = state.store_commit(&tree, &[root], "Internal history");
        let remote = state.remotes.entry(url.to_string()).or_default();
        remote.branches.insert("main".to_string(), commit.clone());
        commit
    }

    /// Add a commit on top of `main` of a remote repository.
    pub(crate) fn push_to_remote(&self, url: &str, files: &[(&str, &str)]) -> String {
        let mut state = self.state.borrow_mut();
        let parent = state
            .remotes
            .get(url)
            .and_then(|r| r.branches.get("main").cloned())
            .into_iter()
            .collect::<Vec<_>>();
        let tree = state.store_tree(to_files(files));
        let commit = state.store_commit(&tree, &parent, "More internal history");
        let remote = state.remotes.entry(url.to_string()).or_default();
        remote.branches.insert("main".to_string(), commit.clone());
        commit
    }

    /// Create or move a branch of a remote repository to a new root commit.
    pub(crate) fn add_origin_branch(&self, url: &str, branch: &str, files: &[(&str, &str)]) -> String {
        let mut state = self.state.borrow_mut();
        let tree = state.store_tree(to_files(files));
        let commit = state.store_commit(&tree, &[], "Earlier publication");
        let remote = state.remotes.entry(url.to_string()).or_default();
        remote.branches.insert(branch.to_string(), commit.clone());
        commit
    }

    /// Tag the tip of `main` of a remote repository.
    pub(crate) fn add_tag(&self, url: &str, tag: &str) -> String {
        let mut state = self.state.borrow_mut();
        let remote = state.remotes.entry(url.to_string()).or_default();
        let commit = remote.branches.get("main").cloned().unwrap_or_default();
        remote.tags.insert(tag.to_string(), commit.clone());
        commit
    }

    pub(crate) fn clone_count(&self) -> usize {
        self.state.borrow().clones
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.state.borrow().fetches
    }

    /// Number of publication commits, i.e. commits created by `commit_tree`.
    pub(crate) fn commits_with_message(&self, message: &str) -> usize {
        self.state
            .borrow()
            .commits
            .values()
            .filter(|c| c.message == message)
            .count()
    }

    pub(crate) fn parents(&self, _repo: &Path, commit: &str) -> Vec<String> {
        self.state
            .borrow()
            .commits
            .get(commit)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    pub(crate) fn message(&self, _repo: &Path, commit: &str) -> String {
        self.state
            .borrow()
            .commits
            .get(commit)
            .map(|c| c.message.clone())
            .unwrap_or_default()
    }

    pub(crate) fn files(&self, commit: &str) -> BTreeMap<String, String> {
        self.state.borrow().tree_of(commit)
    }

    pub(crate) fn tree(&self, commit: &str) -> Option<String> {
        self.state
            .borrow()
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
    }

    pub(crate) fn remote(&self, repo: &Path, name: &str) -> Option<String> {
        self.state
            .borrow()
            .checkouts
            .get(repo)
            .and_then(|c| c.remotes.get(name).cloned())
    }

    /// Pretend the publication branch was pushed to `remote`.
    pub(crate) fn mark_pushed(&self, repo: &Path, remote: &str, branch: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(checkout) = state.checkouts.get_mut(repo) {
            if let Some(tip) = checkout.branches.get(branch).cloned() {
                checkout
                    .remote_branches
                    .insert((remote.to_string(), branch.to_string()), tip);
            }
        }
    }

    fn materialize(&self, repo: &Path, previous: &Files, next: &Files) -> Result<()> {
        for path in previous.keys() {
            if !next.contains_key(path) {
                let full = repo.join(path);
                if full.exists() {
                    fs::remove_file(full)?;
                }
            }
        }
        write_files(repo, next)
    }
}

impl GitOperations for FakeGit {
    fn clone(&self, url: &str, target_dir: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let remote = state.remotes.get(url).ok_or_else(|| Error::GitClone {
            url: url.to_string(),
            message: "repository not found".to_string(),
            hint: None,
        })?;
        let branches = remote.branches.clone();
        let tags = remote.tags.clone();
        let main = branches.get("main").cloned().unwrap_or_default();

        fs::create_dir_all(target_dir.join(".git"))?;
        fs::write(
            target_dir.join(".git/config"),
            format!("[remote \"origin\"]\n\turl = {}\n", url),
        )?;
        let files = state.tree_of(&main);
        write_files(target_dir, &files)?;

        let checkout = Checkout {
            origin: url.to_string(),
            remotes: BTreeMap::new(),
            branches: BTreeMap::from([("main".to_string(), main)]),
            remote_branches: branches
                .into_iter()
                .map(|(b, c)| (("origin".to_string(), b), c))
                .collect(),
            tags,
            head: Head::Branch("main".to_string()),
            staged: BTreeSet::new(),
        };
        state.checkouts.insert(target_dir.to_path_buf(), checkout);
        state.clones += 1;
        Ok(())
    }

    fn fetch(&self, repo: &Path, remote: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let url = state.checkout(repo)?.origin.clone();
        let (branches, tags) = match state.remotes.get(&url) {
            Some(r) => (r.branches.clone(), r.tags.clone()),
            None => return Err(git_error(repo, "fetch", "remote vanished")),
        };
        let checkout = state.checkout_mut(repo)?;
        for (branch, commit) in branches {
            checkout
                .remote_branches
                .insert((remote.to_string(), branch), commit);
        }
        checkout.tags.extend(tags);
        state.fetches += 1;
        Ok(())
    }

    fn reset_hard(&self, repo: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let head = state.head_commit(repo)?;
        let files = state.tree_of(&head);
        state.checkout_mut(repo)?.staged.clear();
        write_files(repo, &files)
    }

    fn resolve_commit(&self, repo: &Path, revision: &str) -> Result<Option<String>> {
        self.state.borrow().resolve(repo, revision)
    }

    fn tag_commit(&self, repo: &Path, tag: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().checkout(repo)?.tags.get(tag).cloned())
    }

    fn checkout_detached(&self, repo: &Path, commit: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let previous = state.tree_of(&state.head_commit(repo)?);
        let next = state.tree_of(commit);
        state.checkout_mut(repo)?.head = Head::Detached(commit.to_string());
        drop(state);
        self.materialize(repo, &previous, &next)
    }

    fn head_commit(&self, repo: &Path) -> Result<String> {
        self.state.borrow().head_commit(repo)
    }

    fn head_tree(&self, repo: &Path) -> Result<String> {
        let state = self.state.borrow();
        let head = state.head_commit(repo)?;
        Ok(state
            .commits
            .get(&head)
            .map(|c| c.tree.clone())
            .unwrap_or_default())
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        Ok(!self.changed_files(repo)?.is_empty())
    }

    fn changed_files(&self, repo: &Path) -> Result<Vec<String>> {
        let state = self.state.borrow();
        let tracked = state.tree_of(&state.head_commit(repo)?);
        let working = read_working_tree(repo)?;
        Ok(tracked
            .iter()
            .filter(|(path, content)| working.get(*path) != Some(*content))
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn stage(&self, repo: &Path, file: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .checkout_mut(repo)?
            .staged
            .insert(file.to_string());
        Ok(())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<String> {
        let working = read_working_tree(repo)?;
        let mut state = self.state.borrow_mut();
        let head = state.head_commit(repo)?;
        let mut files = state.tree_of(&head);
        let staged = std::mem::take(&mut state.checkout_mut(repo)?.staged);
        if staged.is_empty() {
            return Err(git_error(repo, "commit", "nothing to commit"));
        }
        for path in staged {
            match working.get(&path) {
                Some(content) => files.insert(path, content.clone()),
                None => files.remove(&path),
            };
        }
        let tree = state.store_tree(files);
        let commit = state.store_commit(&tree, &[head], message);
        let checkout = state.checkout_mut(repo)?;
        let branch = match &checkout.head {
            Head::Detached(_) => None,
            Head::Branch(branch) => Some(branch.clone()),
        };
        match branch {
            Some(branch) => {
                checkout.branches.insert(branch, commit.clone());
            }
            None => checkout.head = Head::Detached(commit.clone()),
        }
        Ok(commit)
    }

    fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        let checkout = state.checkout(repo)?;
        if remote == "origin" {
            return Ok(Some(checkout.origin.clone()));
        }
        Ok(checkout.remotes.get(remote).cloned())
    }

    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let checkout = state.checkout_mut(repo)?;
        if checkout.remotes.contains_key(remote) {
            return Err(git_error(repo, "remote add", "remote already exists"));
        }
        checkout.remotes.insert(remote.to_string(), url.to_string());
        Ok(())
    }

    fn branch_commit(&self, repo: &Path, branch: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().checkout(repo)?.branches.get(branch).cloned())
    }

    fn remote_branch_commit(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .state
            .borrow()
            .checkout(repo)?
            .remote_branches
            .get(&(remote.to_string(), branch.to_string()))
            .cloned())
    }

    fn commit_tree(
        &self,
        repo: &Path,
        tree: &str,
        parents: &[String],
        message: &str,
    ) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.checkout(repo)?;
        if !state.trees.contains_key(tree) {
            return Err(git_error(repo, "commit-tree", "not a valid object name"));
        }
        Ok(state.store_commit(tree, parents, message))
    }

    fn set_branch(&self, repo: &Path, branch: &str, commit: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .checkout_mut(repo)?
            .branches
            .insert(branch.to_string(), commit.to_string());
        Ok(())
    }

    fn attach_head(&self, repo: &Path, branch: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let previous = state.tree_of(&state.head_commit(repo)?);
        state.checkout_mut(repo)?.head = Head::Branch(branch.to_string());
        let next = state.tree_of(&state.head_commit(repo)?);
        drop(state);
        self.materialize(repo, &previous, &next)
    }
}
