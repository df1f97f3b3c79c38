//! Default values for upstream-merge configuration.
//!
//! This module provides centralized default values used by the configuration
//! loader, the merger and the command-line front end.

use std::path::{Path, PathBuf};

/// Environment variable naming the root all project paths are relative to.
pub const ROOT_ENV_VAR: &str = "UPSTREAM_MERGE_ROOT";

/// Name of the configuration file looked up in the repository root.
pub const DEFAULT_CONFIG_FILENAME: &str = ".upstream-merge.yaml";

/// Name of the per-project merge log of flat-history projects.
pub const MERGE_LOG_FILENAME: &str = ".merged-revisions";

/// Last line of every generated commit message.
pub const AUTOGEN_MESSAGE: &str = "This commit was generated by upstream-merge.";

pub const DEFAULT_SOURCE: &str = "upstream";
pub const DEFAULT_REMOTE: &str = "goog";
pub const DEFAULT_TARGET_BRANCH: &str = "master";
pub const DEFAULT_UPSTREAM_BRANCH: &str = "master-chromium";
pub const DEFAULT_WORKING_BRANCH: &str = "merge-to-master";
pub const DEFAULT_MARKER: &str = "git-svn-id";

/// Returns the default configuration path for a repository root.
///
/// This can be overridden by the `--config` CLI flag.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILENAME)
}
