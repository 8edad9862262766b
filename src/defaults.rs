//! Default values for repo-publisher configuration.
//!
//! This module provides centralized default values used by the configuration
//! loader and the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Configuration file looked up when `--config` is not given.
pub const CONFIG_FILE: &str = "publication.yaml";

/// Manifest file read from the root repository.
pub const MANIFEST_FILE: &str = "default.xml";

/// Branch carrying publication commits, locally and on both remotes.
pub const PUBLICATION_BRANCH: &str = "github_publication";

/// Remote added to every checkout for the manual push.
pub const PUBLIC_REMOTE_NAME: &str = "github";

/// Recipe variable holding the pinned revision.
pub const REVISION_KEY: &str = "SRCREV";

/// Recipe parameter marking an internal transport, dropped on rewrite.
pub const TRANSPORT_SUFFIX: &str = ";protocol=ssh";

pub const MANIFEST_INTERMEDIATE_MESSAGE: &str =
    "Intermediate manifest commit to include updated layers - will be removed during history rework";

pub const LAYER_INTERMEDIATE_MESSAGE: &str =
    "Intermediate layer commit to include updated repositories - will be removed during history rework";

/// Recipe variables declaring a branch, consulted in order.
pub fn branch_keys() -> Vec<String> {
    vec!["SRCBRANCH".to_string(), "BRANCH".to_string()]
}

/// Returns the default checkout root.
///
/// Checkouts live under `repo/` relative to the working directory so that a
/// later run reuses them. This can be overridden by the `--checkout-root`
/// CLI flag or the `checkout_root` configuration key.
pub fn checkout_root() -> PathBuf {
    PathBuf::from("repo")
}
