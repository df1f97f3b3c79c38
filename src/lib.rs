//! # Upstream Merge Library
//!
//! This library merges the upstream tracking branch of a set of git projects
//! into a target branch. Large projects are merged with flattened history and
//! every such merge is recorded in a provenance log; smaller projects are
//! merged normally. It is used by the `upstream-merge` command-line tool.
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: Defines the schema for `.upstream-merge.yaml`,
//!   listing flat-history and full-history projects and the branch names.
//! - **Git (`git`)**: Runs the system `git` binary inside an explicit
//!   directory.
//! - **Revision (`revision`)**: Extracts the upstream revision number from the
//!   marker line of the newest imported upstream commit.
//! - **Merge Log (`merge_log`)**: Reads and appends `.merged-revisions` and
//!   installs it as grafts for the duration of a merge.
//! - **Merger (`merger`)**: Merges one project at a time and reports typed
//!   outcomes.
//! - **Output (`output`)**: Color and symbol choices for the run summary.
//! - **Publishing (`publish`)**: Runs the whole pipeline and hands the result
//!   to a push collaborator.
//!
//! ## Execution Flow
//!
//! 1.  **Resolve**: Find the upstream revision.
//! 2.  **Merge flat-history projects**: Squash, prune, commit, record.
//! 3.  **Merge full-history projects**: Ordinary merge and commit.
//! 4.  **Push**: Publish the working branch to the target branch.
//!
//! Any error stops the pipeline where it happened. Nothing is pushed unless
//! every project merged cleanly or was already up to date.

pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod merge_log;
pub mod merger;
pub mod output;
pub mod publish;
pub mod revision;
