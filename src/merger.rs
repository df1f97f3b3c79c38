//! # Project Merger
//!
//! Merges the upstream branch of every configured project into a local
//! working branch that tracks the target branch.
//!
//! ## Strategies
//!
//! - **Flat history**: the upstream changes are squashed into one commit. The
//!   project's merge log is installed as grafts first so the merge base is
//!   correct, configured prune paths are deleted from the result, and after
//!   the merge commit a provenance record is appended to the log and
//!   committed separately.
//! - **Full history**: an ordinary `--no-ff` merge that keeps upstream
//!   ancestry, so no bookkeeping is needed.
//!
//! ## Conflicts
//!
//! `git merge` exits non-zero when it stops on conflicts. That exit status is
//! tolerated and the repository status is inspected instead, giving a typed
//! [`MergeStatus`]. Unresolved conflicts reset the working tree to HEAD and
//! abort the whole run; projects merged earlier in the run stay committed.
//!
//! ## Per-project states
//!
//! ```text
//! NotChecked -> UpToDate
//! NotChecked -> Merging -> Committed -> LogUpdated   (flat only)
//!                       \-> Failed
//! ```

use std::fmt;
use std::path::PathBuf;

use log::{debug, warn};

use crate::config::{Config, Project};
use crate::defaults::{AUTOGEN_MESSAGE, MERGE_LOG_FILENAME};
use crate::error::{Error, Result};
use crate::git::Git;
use crate::merge_log::{MergeLog, MergeRecord};
use crate::revision::Revision;

/// Unmerged path codes reported by `git status --porcelain`.
const CONFLICT_CODES: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

/// Everything a merge run needs, passed explicitly instead of read from the
/// process environment or working directory.
#[derive(Debug, Clone)]
pub struct MergeContext {
    root: PathBuf,
    config: Config,
}

impl MergeContext {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute directory of a project.
    pub fn project_dir(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// A git handle bound to a project's directory.
    pub fn git_for(&self, path: &str) -> Git {
        Git::new(self.project_dir(path))
    }
}

/// Where a project is in its merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    NotChecked,
    UpToDate,
    Merging,
    Committed,
    LogUpdated,
    Failed,
}

impl MergeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MergeState::UpToDate | MergeState::Committed | MergeState::LogUpdated | MergeState::Failed
        )
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeState::NotChecked => "not checked",
            MergeState::UpToDate => "up to date",
            MergeState::Merging => "merging",
            MergeState::Committed => "committed",
            MergeState::LogUpdated => "log updated",
            MergeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of inspecting the repository after a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    Clean,
    /// Porcelain status lines of the unmerged paths.
    Conflicted(Vec<String>),
}

/// What happened to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The upstream branch had nothing new.
    UpToDate,
    /// Full-history merge commit.
    Merged { commit: String },
    /// Flat-history squash commit and the commit recording it.
    Flattened {
        commit: String,
        record_commit: String,
        record: MergeRecord,
    },
}

impl MergeOutcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> MergeState {
        match self {
            MergeOutcome::UpToDate => MergeState::UpToDate,
            MergeOutcome::Merged { .. } => MergeState::Committed,
            MergeOutcome::Flattened { .. } => MergeState::LogUpdated,
        }
    }
}

/// The outcome of one project in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub path: String,
    pub outcome: MergeOutcome,
}

/// First line of a merge commit message, followed by the autogen marker.
pub fn merge_message(source: &str, revision: &Revision) -> String {
    format!(
        "Merge from {} at revision r{}\n\n{}",
        source, revision, AUTOGEN_MESSAGE
    )
}

/// Message of the commit that records a flat merge in the merge log.
pub fn record_message(revision: &Revision) -> String {
    format!("Record merge at revision r{}\n\n{}", revision, AUTOGEN_MESSAGE)
}

/// Picks the unmerged entries out of `git status --porcelain` output.
pub fn parse_conflicts(status: &str) -> Vec<String> {
    status
        .lines()
        .filter(|line| {
            line.get(..2).is_some_and(|code| CONFLICT_CODES.contains(&code))
                && line.as_bytes().get(2) == Some(&b' ')
        })
        .map(str::to_string)
        .collect()
}

fn transition(path: &str, state: &mut MergeState, next: MergeState) {
    debug!("{}: {} -> {}", path, state, next);
    *state = next;
}

/// Called with a project's path each time it enters a new state.
pub type Progress<'a> = &'a dyn Fn(&str, MergeState);

/// Merges projects at one upstream revision.
pub struct ProjectMerger<'a> {
    context: &'a MergeContext,
    revision: &'a Revision,
    progress: Option<Progress<'a>>,
}

impl<'a> ProjectMerger<'a> {
    pub fn new(context: &'a MergeContext, revision: &'a Revision) -> Self {
        Self {
            context,
            revision,
            progress: None,
        }
    }

    /// Reports every state change to `progress`.
    pub fn with_progress(mut self, progress: Progress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn advance(&self, path: &str, state: &mut MergeState, next: MergeState) {
        transition(path, state, next);
        if let Some(progress) = self.progress {
            progress(path, next);
        }
    }

    /// Merges every configured project, flat-history projects first.
    ///
    /// Stops at the first error; projects already merged keep their commits.
    pub fn merge_all(&self) -> Result<Vec<ProjectReport>> {
        let mut reports = Vec::new();
        for project in self.context.config().merge_order() {
            let outcome = self.merge_project(project)?;
            reports.push(ProjectReport {
                path: project.path().to_string(),
                outcome,
            });
        }
        Ok(reports)
    }

    /// Merges a single project.
    pub fn merge_project(&self, project: &Project) -> Result<MergeOutcome> {
        let path = project.path();
        let git = self.context.git_for(path);
        let mut state = MergeState::NotChecked;

        self.checkout_working_branch(&git, path)?;

        let result = match project {
            Project::Flat { flat } => self.merge_flat(&git, path, &flat.prune, &mut state),
            Project::Full { .. } => self.merge_full(&git, path, &mut state),
        };

        if result.is_err() && state == MergeState::Merging {
            self.advance(path, &mut state, MergeState::Failed);
        }
        result
    }

    fn checkout_working_branch(&self, git: &Git, path: &str) -> Result<()> {
        let dirty = git.run(["status", "--porcelain", "--untracked-files=no"])?;
        if !dirty.trim().is_empty() {
            return Err(Error::DirtyWorkingTree {
                project: path.to_string(),
            });
        }

        let config = self.context.config();
        let target = config.target_ref();
        git.run([
            "checkout",
            "-B",
            config.working_branch.as_str(),
            "--track",
            target.as_str(),
        ])?;
        debug!("{}: on {} tracking {}", path, config.working_branch, target);
        Ok(())
    }

    fn merge_flat(
        &self,
        git: &Git,
        path: &str,
        prune: &[String],
        state: &mut MergeState,
    ) -> Result<MergeOutcome> {
        let config = self.context.config();
        let merge_sha = git.rev_parse(&config.upstream_ref())?;
        let old_sha = git.rev_parse("HEAD")?;

        let merge_log = MergeLog::for_project(git.dir());
        let grafts = merge_log.install_grafts(git)?;

        if !git.has_commits_between("HEAD", &merge_sha)? {
            debug!("{}: no new commits", path);
            self.advance(path, state, MergeState::UpToDate);
            return Ok(MergeOutcome::UpToDate);
        }

        self.advance(path, state, MergeState::Merging);
        self.attempt_merge(git, &["--squash", merge_sha.as_str()])?;

        if !prune.is_empty() {
            debug!("{}: pruning {}", path, prune.join(", "));
            let mut args = vec!["rm", "--ignore-unmatch", "-rf", "--"];
            args.extend(prune.iter().map(String::as_str));
            git.run(&args)?;
        }

        self.ensure_clean(git, path)?;
        // Everything upstream may have been pruned; the merge is still recorded.
        let new_sha = git.commit(&merge_message(&config.source, self.revision), true)?;
        self.advance(path, state, MergeState::Committed);
        drop(grafts);

        let record = MergeRecord {
            new_commit: new_sha.clone(),
            old_commit: old_sha,
            source_commit: merge_sha,
        };
        merge_log.append(&record)?;
        git.run(["add", "--", MERGE_LOG_FILENAME])?;
        let record_commit = git.commit(&record_message(self.revision), false)?;
        self.advance(path, state, MergeState::LogUpdated);

        Ok(MergeOutcome::Flattened {
            commit: new_sha,
            record_commit,
            record,
        })
    }

    fn merge_full(&self, git: &Git, path: &str, state: &mut MergeState) -> Result<MergeOutcome> {
        let config = self.context.config();
        let upstream = config.upstream_ref();

        if !git.has_commits_between("HEAD", &upstream)? {
            debug!("{}: no new commits", path);
            self.advance(path, state, MergeState::UpToDate);
            return Ok(MergeOutcome::UpToDate);
        }

        self.advance(path, state, MergeState::Merging);
        self.attempt_merge(git, &["--no-ff", upstream.as_str()])?;
        self.ensure_clean(git, path)?;
        let commit = git.commit(&merge_message(&config.source, self.revision), false)?;
        self.advance(path, state, MergeState::Committed);

        Ok(MergeOutcome::Merged { commit })
    }

    /// Runs `git merge --no-commit` with extra arguments.
    ///
    /// A merge that stops on conflicts exits non-zero and leaves unmerged
    /// paths behind; those are left for [`ProjectMerger::inspect`]. A non-zero
    /// exit with no unmerged paths means git refused the merge (untracked
    /// files in the way, unrelated histories) and is returned as an error so
    /// nothing gets committed or recorded.
    fn attempt_merge(&self, git: &Git, extra: &[&str]) -> Result<()> {
        let mut args = vec!["merge", "--no-commit"];
        args.extend_from_slice(extra);
        let output = git.output(&args)?;
        if output.status.success() {
            return Ok(());
        }

        debug!(
            "git merge exited with {} in {}",
            output.status,
            git.dir().display()
        );
        match Self::inspect(git)? {
            MergeStatus::Conflicted(_) => Ok(()),
            MergeStatus::Clean => Err(Error::GitCommand {
                command: args.join(" "),
                dir: git.dir().to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    /// Reads the repository status after a merge attempt.
    pub fn inspect(git: &Git) -> Result<MergeStatus> {
        let conflicts = parse_conflicts(&git.status_porcelain()?);
        if conflicts.is_empty() {
            Ok(MergeStatus::Clean)
        } else {
            Ok(MergeStatus::Conflicted(conflicts))
        }
    }

    fn ensure_clean(&self, git: &Git, path: &str) -> Result<()> {
        match Self::inspect(git)? {
            MergeStatus::Clean => Ok(()),
            MergeStatus::Conflicted(paths) => {
                warn!("{}: {} unresolved conflict(s), resetting", path, paths.len());
                git.run(["reset", "--hard", "HEAD"])?;
                Err(Error::MergeConflict {
                    project: path.to_string(),
                    paths,
                })
            }
        }
    }
}
