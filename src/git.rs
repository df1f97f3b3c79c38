//! # Git Command Runner
//!
//! All repository access goes through the system `git` binary. A [`Git`]
//! handle is bound to one working directory and every command it runs uses
//! that directory explicitly, so the process working directory is never
//! changed while projects are merged.
//!
//! Using the system binary means the user's credentials, SSH keys and
//! configuration all apply to fetches and pushes without any extra setup.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::trace;

use crate::error::{Error, Result};

/// Silences the deprecation hint git prints whenever `info/grafts` exists.
const GRAFT_ADVICE: &str = "advice.graftFileDeprecated=false";

/// A handle for running `git` inside one repository.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    /// Creates a handle that runs every command inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The working directory commands are run in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn describe<I, S>(args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs `git` and returns its raw output, whatever the exit status.
    ///
    /// Only a failure to start the binary is an error. Callers that expect a
    /// non-zero exit as part of normal operation (such as a conflicting
    /// merge) use this and inspect the repository afterwards.
    pub fn output<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        trace!("git {} (in {})", Self::describe(args.clone()), self.dir.display());
        Command::new("git")
            .args(["-c", GRAFT_ADVICE])
            .args(args.clone())
            .current_dir(&self.dir)
            .output()
            .map_err(|source| Error::GitSpawn {
                command: Self::describe(args),
                dir: self.dir.clone(),
                source,
            })
    }

    /// Runs `git` and returns stdout, failing on a non-zero exit.
    pub fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        let output = self.output(args.clone())?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                command: Self::describe(args),
                dir: self.dir.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Resolves a revision to its full commit id.
    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        Ok(self.run(["rev-parse", rev])?.trim().to_string())
    }

    /// Returns true when `to` has at least one commit not reachable from `from`.
    pub fn has_commits_between(&self, from: &str, to: &str) -> Result<bool> {
        let range = format!("{}..{}", from, to);
        Ok(!self.run(["rev-list", "-1", range.as_str()])?.trim().is_empty())
    }

    /// Resolves a path inside the repository's git directory, such as
    /// `info/grafts`. Works for linked worktrees as well as plain clones.
    pub fn git_path(&self, path: &str) -> Result<PathBuf> {
        let resolved = PathBuf::from(self.run(["rev-parse", "--git-path", path])?.trim());
        if resolved.is_absolute() {
            Ok(resolved)
        } else {
            Ok(self.dir.join(resolved))
        }
    }

    /// Returns `git status --porcelain` output.
    pub fn status_porcelain(&self) -> Result<String> {
        self.run(["status", "--porcelain"])
    }

    /// Commits the index with `message` and returns the new HEAD.
    pub fn commit(&self, message: &str, allow_empty: bool) -> Result<String> {
        let mut args = vec!["commit", "--no-verify", "-m", message];
        if allow_empty {
            args.push("--allow-empty");
        }
        self.run(&args)?;
        self.rev_parse("HEAD")
    }
}
