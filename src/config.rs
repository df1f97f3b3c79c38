//! # Configuration Schema and Parsing
//!
//! This module defines the `.upstream-merge.yaml` configuration file and the
//! logic for parsing and validating it.
//!
//! ## Key Components
//!
//! - **`Config`**: Branch and remote names shared by every project, plus the
//!   ordered list of projects.
//! - **`Project`**: An enum with one variant per merge strategy. Flat-history
//!   projects carry their prune list; full-history projects carry nothing
//!   beyond their path.
//!
//! ## Format
//!
//! ```yaml
//! source: Chromium
//! remote: goog
//! target_branch: master
//! upstream_branch: master-chromium
//! working_branch: merge-to-master
//! marker: git-svn-id
//! projects:
//!   - flat:
//!       path: external/chromium
//!       prune: [third_party/WebKit/LayoutTests]
//!   - full:
//!       path: external/skia
//! ```
//!
//! Every key except `projects` has a default.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Flat-history project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatProject {
    /// Path of the project relative to the repository root.
    pub path: String,
    /// Subdirectories deleted from the result of every squash merge.
    #[serde(default)]
    pub prune: Vec<String>,
}

/// Full-history project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullProject {
    /// Path of the project relative to the repository root.
    pub path: String,
}

/// A project whose upstream branch is merged into the target branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Project {
    /// Upstream changes are squashed into a single commit and every merge is
    /// recorded in the project's merge log.
    Flat { flat: FlatProject },
    /// Upstream changes are merged with their full ancestry.
    Full { full: FullProject },
}

impl Project {
    /// Path of the project relative to the repository root.
    pub fn path(&self) -> &str {
        match self {
            Project::Flat { flat } => &flat.path,
            Project::Full { full } => &full.path,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Project::Flat { .. })
    }

    /// Paths to remove after merging. Always empty for full-history projects.
    pub fn prune(&self) -> &[String] {
        match self {
            Project::Flat { flat } => &flat.prune,
            Project::Full { .. } => &[],
        }
    }
}

fn default_source() -> String {
    defaults::DEFAULT_SOURCE.to_string()
}

fn default_remote() -> String {
    defaults::DEFAULT_REMOTE.to_string()
}

fn default_target_branch() -> String {
    defaults::DEFAULT_TARGET_BRANCH.to_string()
}

fn default_upstream_branch() -> String {
    defaults::DEFAULT_UPSTREAM_BRANCH.to_string()
}

fn default_working_branch() -> String {
    defaults::DEFAULT_WORKING_BRANCH.to_string()
}

fn default_marker() -> String {
    defaults::DEFAULT_MARKER.to_string()
}

/// The complete merge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the upstream used in generated commit messages.
    #[serde(default = "default_source")]
    pub source: String,
    /// Remote that holds both the target and the upstream branch.
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Branch the upstream changes are merged into and pushed to.
    #[serde(default = "default_target_branch")]
    pub target_branch: String,
    /// Branch tracking the upstream project.
    #[serde(default = "default_upstream_branch")]
    pub upstream_branch: String,
    /// Local branch the merges are committed on.
    #[serde(default = "default_working_branch")]
    pub working_branch: String,
    /// Key of the commit message line carrying the upstream revision.
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Project whose upstream log is searched for the revision marker.
    /// Defaults to the first configured project.
    #[serde(default)]
    pub revision_project: Option<String>,
    pub projects: Vec<Project>,
}

impl Config {
    /// `<remote>/<upstream_branch>`
    pub fn upstream_ref(&self) -> String {
        format!("{}/{}", self.remote, self.upstream_branch)
    }

    /// `<remote>/<target_branch>`
    pub fn target_ref(&self) -> String {
        format!("{}/{}", self.remote, self.target_branch)
    }

    /// Path of the project used for revision resolution.
    pub fn revision_project(&self) -> Option<&str> {
        self.revision_project
            .as_deref()
            .or_else(|| self.projects.first().map(Project::path))
    }

    /// Flat-history projects first, then full-history projects, each group in
    /// configuration order.
    pub fn merge_order(&self) -> Vec<&Project> {
        let (flat, full): (Vec<&Project>, Vec<&Project>) =
            self.projects.iter().partition(|p| p.is_flat());
        flat.into_iter().chain(full).collect()
    }

    /// Checks the rules serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.projects.is_empty() {
            return Err(Error::ConfigParse {
                message: "No projects configured".to_string(),
                hint: Some("Add at least one 'flat:' or 'full:' entry under 'projects:'".to_string()),
            });
        }

        for (key, value) in [
            ("remote", &self.remote),
            ("target_branch", &self.target_branch),
            ("upstream_branch", &self.upstream_branch),
            ("working_branch", &self.working_branch),
            ("marker", &self.marker),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("'{}' must not be empty", key),
                    hint: None,
                });
            }
        }

        if self.working_branch == self.target_branch {
            return Err(Error::ConfigParse {
                message: format!(
                    "working_branch and target_branch are both '{}'",
                    self.working_branch
                ),
                hint: Some("Merges are committed on a separate local branch".to_string()),
            });
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            let path = project.path();
            if path.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: "Project path must not be empty".to_string(),
                    hint: None,
                });
            }
            if Path::new(path).is_absolute() {
                return Err(Error::ConfigParse {
                    message: format!("Project path '{}' is absolute", path),
                    hint: Some("Project paths are relative to the repository root".to_string()),
                });
            }
            if !seen.insert(path) {
                return Err(Error::ConfigParse {
                    message: format!("Project '{}' is listed more than once", path),
                    hint: None,
                });
            }
            if let Some(bad) = project.prune().iter().find(|p| Path::new(p).is_absolute()) {
                return Err(Error::ConfigParse {
                    message: format!("Prune path '{}' in project '{}' is absolute", bad, path),
                    hint: None,
                });
            }
        }

        if let Some(revision_project) = &self.revision_project {
            if !seen.contains(revision_project.as_str()) {
                return Err(Error::ConfigParse {
                    message: format!(
                        "revision_project '{}' is not a configured project",
                        revision_project
                    ),
                    hint: None,
                });
            }
        }

        Ok(())
    }
}

/// Parses and validates a YAML configuration string.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(yaml_content)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
