//! Thin wrappers around the system `git` command.
//!
//! Every function runs `git -C <repo> ...`, so SSH keys, credential helpers
//! and author identity configured for the operator apply unchanged.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::error::{Error, Result};

fn spawn<I, S>(repo: &Path, args: I) -> Result<(String, Output)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let command = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("git -C {} {}", repo.display(), command);

    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(&args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            repository: repo.display().to_string(),
            stderr: e.to_string(),
        })?;
    Ok((command, output))
}

/// Run a git command and return its trimmed stdout.
fn run<I, S>(repo: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let (command, output) = spawn(repo, args)?;
    if !output.status.success() {
        return Err(Error::GitCommand {
            command,
            repository: repo.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a lookup that exits with status 1 when the object does not exist.
fn run_lookup<I, S>(repo: &Path, args: I) -> Result<Option<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let (command, output) = spawn(repo, args)?;
    match output.status.code() {
        Some(0) => Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        )),
        Some(1) => Ok(None),
        _ => Err(Error::GitCommand {
            command,
            repository: repo.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Clone `url` into `target_dir`, creating parent directories.
pub fn clone(url: &str, target_dir: &Path) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = Command::new("git")
        .args(["clone", "--quiet", url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            message: e.to_string(),
            hint: Some("Make sure git is installed and on PATH".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Check that your SSH key is loaded in ssh-agent and has access to the internal host"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            message: stderr,
            hint,
        });
    }

    Ok(())
}

/// Fetch branches and tags from `remote`.
pub fn fetch(repo: &Path, remote: &str) -> Result<()> {
    run(repo, ["fetch", "--quiet", "--tags", "--force", remote]).map(|_| ())
}

/// Discard index and working tree modifications of tracked files.
pub fn reset_hard(repo: &Path) -> Result<()> {
    run(repo, ["reset", "--quiet", "--hard"]).map(|_| ())
}

/// Resolve any revision expression to a commit hash.
pub fn resolve_commit(repo: &Path, revision: &str) -> Result<Option<String>> {
    run_lookup(
        repo,
        [
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("{}^{{commit}}", revision),
        ],
    )
}

/// Commit a tag points to, peeling annotated tags.
pub fn tag_commit(repo: &Path, tag: &str) -> Result<Option<String>> {
    resolve_commit(repo, &format!("refs/tags/{}", tag))
}

/// Move HEAD to `commit` without a branch, overwriting the working tree.
pub fn checkout_detached(repo: &Path, commit: &str) -> Result<()> {
    run(repo, ["checkout", "--quiet", "--force", "--detach", commit]).map(|_| ())
}

pub fn head_commit(repo: &Path) -> Result<String> {
    run(repo, ["rev-parse", "HEAD"])
}

pub fn head_tree(repo: &Path) -> Result<String> {
    run(repo, ["rev-parse", "HEAD^{tree}"])
}

/// True when tracked files differ from HEAD. Untracked files are ignored.
pub fn is_dirty(repo: &Path) -> Result<bool> {
    let status = run(repo, ["status", "--porcelain", "--untracked-files=no"])?;
    Ok(!status.is_empty())
}

/// Tracked paths that differ from HEAD, including deletions.
pub fn changed_files(repo: &Path) -> Result<Vec<String>> {
    let names = run(repo, ["diff", "--name-only", "HEAD"])?;
    Ok(names
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Stage a path, including its removal.
pub fn stage(repo: &Path, file: &str) -> Result<()> {
    run(repo, ["add", "--all", "--", file]).map(|_| ())
}

/// Commit the index and return the new HEAD.
pub fn commit(repo: &Path, message: &str) -> Result<String> {
    run(repo, ["commit", "--quiet", "-m", message])?;
    head_commit(repo)
}

pub fn remote_url(repo: &Path, remote: &str) -> Result<Option<String>> {
    run_lookup(repo, ["config", "--get", &format!("remote.{}.url", remote)])
}

pub fn add_remote(repo: &Path, remote: &str, url: &str) -> Result<()> {
    run(repo, ["remote", "add", remote, url]).map(|_| ())
}

/// Tip of a local branch.
pub fn branch_commit(repo: &Path, branch: &str) -> Result<Option<String>> {
    resolve_commit(repo, &format!("refs/heads/{}", branch))
}

/// Tip of a remote-tracking branch as of the last fetch.
pub fn remote_branch_commit(repo: &Path, remote: &str, branch: &str) -> Result<Option<String>> {
    resolve_commit(repo, &format!("refs/remotes/{}/{}", remote, branch))
}

/// Create a commit object from an existing tree with explicit parents.
pub fn commit_tree(repo: &Path, tree: &str, parents: &[String], message: &str) -> Result<String> {
    let mut args = vec!["commit-tree".to_string(), tree.to_string()];
    for parent in parents {
        args.push("-p".to_string());
        args.push(parent.clone());
    }
    args.push("-m".to_string());
    args.push(message.to_string());
    run(repo, args)
}

/// Point a local branch at `commit`, creating it when absent.
pub fn set_branch(repo: &Path, branch: &str, commit: &str) -> Result<()> {
    run(repo, ["update-ref", &format!("refs/heads/{}", branch), commit]).map(|_| ())
}

/// Make HEAD follow `branch` and materialize its tree.
pub fn attach_head(repo: &Path, branch: &str) -> Result<()> {
    run(repo, ["symbolic-ref", "HEAD", &format!("refs/heads/{}", branch)])?;
    reset_hard(repo)
}
