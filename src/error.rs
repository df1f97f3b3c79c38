//! # Error Handling
//!
//! This module defines the centralized error type for `upstream-merge`. It uses
//! `thiserror` to build a single `Error` enum covering every failure mode of
//! the merge pipeline, grouped by where the failure comes from:
//!
//! - **Configuration**: a missing environment precondition or an invalid
//!   configuration file. Reported before any repository is touched.
//! - **Resolution**: the upstream revision marker could not be found.
//! - **Merge conflicts**: a merge left unresolved paths behind.
//! - **Tool invocation**: the `git` binary could not be started or exited with
//!   an unexpected failure.
//!
//! None of these are retried. Every variant requires a human to look at the
//! situation before the tool is run again.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for upstream-merge operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required environment variable is not set.
    #[error("Environment variable {variable} is not set{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    MissingEnvironment {
        variable: String,
        /// Optional hint for how to set up the environment
        hint: Option<String>,
    },

    /// The configuration file is structurally valid YAML but violates a rule.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// No commit on the upstream ref carries the revision marker.
    #[error("No commit on {reference} carries a '{marker}:' revision marker")]
    RevisionNotFound { reference: String, marker: String },

    /// A merge left unresolved conflicts in a project.
    #[error("Unresolved merge conflicts in {project}:\n{}", paths.join("\n"))]
    MergeConflict { project: String, paths: Vec<String> },

    /// A project has uncommitted changes to tracked files.
    #[error("Project {project} has uncommitted changes\n  hint: commit or stash them before merging")]
    DirtyWorkingTree { project: String },

    /// The `git` binary could not be started.
    #[error("Failed to run git {command} in {}: {source}", dir.display())]
    GitSpawn {
        command: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `git` command exited with a non-zero status.
    #[error("Git command failed in {}: git {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// A line in a `.merged-revisions` file is not a commit triple.
    #[error("Malformed merge log {} at line {line}: {content}", path.display())]
    MalformedMergeLog {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// The push step failed or could not prompt for confirmation.
    #[error("Push error: {message}")]
    Push { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
