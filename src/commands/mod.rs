//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `repo-publisher` command-line tool, one file per subcommand.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the resolved
//!   output configuration, and calls into the `repo_publisher` library.

pub mod publish;
pub mod scan;
