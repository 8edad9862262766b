//! # Repo Publisher Library
//!
//! This library prepares a tree of internal repositories for public release.
//! Starting from a manifest repository at a tag, it visits every layer the
//! manifest lists and every source those layers' recipes cite, replaces each
//! repository's history with a single publication commit, and rewrites the
//! references between them so that the published graph only points at
//! public coordinates.
//!
//! It is used by the `repo-publisher` command-line tool but can be driven
//! directly, for example with a custom `GitOperations` implementation.
//!
//! ## Quick Example
//!
//! ```
//! use repo_publisher::config;
//!
//! let config = config::parse(r#"
//! manifest:
//!   name: platform.git
//!   url: ssh://git@stash.example.com/base
//!   remote: internal
//! internal_hosts:
//!   - git@stash.example.com
//! publication:
//!   push_url: git@github.com:Org
//!   manifest_url: https://github.com/Org
//!   recipe_url: git://github.com/Org
//! "#).unwrap();
//!
//! assert_eq!(config.publication.branch, "github_publication");
//! assert_eq!(
//!     config.clone_url("git://git@stash.example.com/base"),
//!     "ssh://git@stash.example.com/base"
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `defaults`)**: every setting of a run in one
//!   `PublicationConfig` value, passed by reference to each component.
//! - **References (`reference`)**: `RepositoryReference` as read from a file,
//!   `PublishedReference` once the repository has its publication commit.
//! - **Checkouts (`repository`, `git`)**: `RepositoryHandle` and the
//!   `GitOperations` trait it drives, implemented over the system `git`.
//! - **Extraction (`extract`)** and **patching (`patch`)**: reading references
//!   out of the XML manifest and of recipes, and rewriting them.
//! - **Engine (`engine`, `cache`)**: the per-repository state machine and the
//!   memo that publishes each repository once per run.
//! - **Walker and report (`walker`, `report`)**: the run entry point and the
//!   operator summary with push commands.
//!
//! ## Execution Flow
//!
//! 1. **Tag resolution**: the manifest repository is cloned or fetched and
//!    the tag resolved to a commit.
//! 2. **Depth-first publication**: each repository is checked out, its
//!    references extracted and published first, then rewritten in place.
//! 3. **Intermediate commit**: rewritten files are committed so the change
//!    can be inspected.
//! 4. **Squash**: a parentless (or publication-branch-parented) commit with
//!    the same tree becomes the tip of the publication branch.
//! 5. **Report**: checkouts with unpushed publication commits are listed
//!    with the commands to push them.

pub mod cache;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod extract;
pub mod git;
pub mod output;
pub mod patch;
pub mod reference;
pub mod report;
pub mod repository;
pub mod walker;

#[cfg(test)]
mod patch_proptest;
#[cfg(test)]
mod test_support;
