//! # Upstream Revision Resolution
//!
//! Upstream commits that were imported from another version control system
//! carry a marker line in their message body, for example:
//!
//! ```text
//! git-svn-id: http://src.chromium.org/svn/trunk/src@12345 0039d316-1c4b-4281-b951-d872f2087c98
//! ```
//!
//! The number after `@` on the newest such line is the upstream revision. It is
//! embedded into every commit message the merger generates.

use std::fmt;

use log::{debug, info};
use regex::Regex;

use crate::error::{Error, Result};
use crate::git::Git;

/// A numeric upstream revision, kept verbatim as extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the revision number from `git log --format=%H%n%b` output.
///
/// Returns `None` when no line starts with `<marker>: ` followed by a
/// `<scheme>@<number>` value.
pub fn parse_revision(log_output: &str, marker: &str) -> Result<Option<Revision>> {
    let pattern = format!(r"(?m)^{}: .*@([0-9]+)", regex::escape(marker));
    let re = Regex::new(&pattern)?;
    Ok(re
        .captures(log_output)
        .and_then(|caps| caps.get(1))
        .map(|m| Revision(m.as_str().to_string())))
}

/// Finds the newest commit on `upstream_ref` with a `<marker>:` line and
/// returns its revision number.
///
/// The marker is matched literally on both sides, so markers containing
/// regex metacharacters such as `.` behave as written.
pub fn resolve(git: &Git, upstream_ref: &str, marker: &str) -> Result<Revision> {
    info!("Getting upstream revision from {} ...", upstream_ref);
    let grep = format!("--grep={}:", marker);
    let log = git.run([
        "log",
        "-n1",
        "--fixed-strings",
        grep.as_str(),
        "--format=%H%n%b",
        upstream_ref,
    ])?;

    let not_found = || Error::RevisionNotFound {
        reference: upstream_ref.to_string(),
        marker: marker.to_string(),
    };

    let sha = log.split_whitespace().next().ok_or_else(not_found)?;
    let revision = parse_revision(&log, marker)?.ok_or_else(not_found)?;
    debug!("Commit {} is at upstream revision r{}", sha, revision);
    Ok(revision)
}
