//! # Publishing
//!
//! The top of the pipeline: resolve the upstream revision, merge every
//! project, then hand the working branch to a [`Pusher`]. Any failure before
//! the push step returns early, so nothing is pushed unless every project
//! reached a successful terminal state.
//!
//! [`Pusher`] is a trait so the push step can be replaced in tests. The
//! default [`GitPusher`] asks for confirmation (unless told not to) and runs
//! `git push` in every project.

use dialoguer::{theme::ColorfulTheme, Confirm};
use log::info;

use crate::error::{Error, Result};
use crate::merger::{MergeContext, ProjectMerger, ProjectReport, Progress};
use crate::revision::{self, Revision};

/// Whether the push step actually pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    Pushed,
    /// The user answered no to the confirmation prompt.
    Declined,
}

/// Publishes a local branch to the target branch on the configured remote.
pub trait Pusher {
    fn push(
        &self,
        context: &MergeContext,
        local_branch: &str,
        target_branch: &str,
        auto_confirm: bool,
    ) -> Result<PushResult>;
}

/// The default implementation of `Pusher`, which runs `git push` in each
/// configured project.
#[derive(Debug, Default)]
pub struct GitPusher;

impl GitPusher {
    fn confirm(remote: &str, local_branch: &str, target_branch: &str) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Push {} to {}/{} in every project?",
                local_branch, remote, target_branch
            ))
            .default(false)
            .interact()
            .map_err(|e| Error::Push {
                message: format!("could not ask for confirmation: {}", e),
            })
    }
}

impl Pusher for GitPusher {
    fn push(
        &self,
        context: &MergeContext,
        local_branch: &str,
        target_branch: &str,
        auto_confirm: bool,
    ) -> Result<PushResult> {
        let config = context.config();
        if !auto_confirm && !Self::confirm(&config.remote, local_branch, target_branch)? {
            return Ok(PushResult::Declined);
        }

        let refspec = format!("{}:{}", local_branch, target_branch);
        for project in config.merge_order() {
            info!("Pushing {} in project {} ...", refspec, project.path());
            context
                .git_for(project.path())
                .run(["push", config.remote.as_str(), refspec.as_str()])?;
        }
        Ok(PushResult::Pushed)
    }
}

/// Everything a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub revision: Revision,
    pub projects: Vec<ProjectReport>,
    pub push: PushResult,
}

/// Runs resolve, merge and push in order.
pub struct Publisher<'a, P: Pusher> {
    context: &'a MergeContext,
    pusher: P,
    progress: Option<Progress<'a>>,
}

impl<'a, P: Pusher> Publisher<'a, P> {
    pub fn new(context: &'a MergeContext, pusher: P) -> Self {
        Self {
            context,
            pusher,
            progress: None,
        }
    }

    /// Forwards per-project state changes to `progress` while merging.
    pub fn with_progress(mut self, progress: Progress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolves the upstream revision from the configured revision project.
    pub fn resolve_revision(&self) -> Result<Revision> {
        let config = self.context.config();
        let project = config.revision_project().ok_or_else(|| Error::ConfigParse {
            message: "No project to read the upstream revision from".to_string(),
            hint: None,
        })?;
        revision::resolve(
            &self.context.git_for(project),
            &config.upstream_ref(),
            &config.marker,
        )
    }

    pub fn publish(&self, auto_confirm: bool) -> Result<PublishReport> {
        let revision = self.resolve_revision()?;
        let mut merger = ProjectMerger::new(self.context, &revision);
        if let Some(progress) = self.progress {
            merger = merger.with_progress(progress);
        }
        let projects = merger.merge_all()?;

        let config = self.context.config();
        let push = self.pusher.push(
            self.context,
            &config.working_branch,
            &config.target_branch,
            auto_confirm,
        )?;

        Ok(PublishReport {
            revision,
            projects,
            push,
        })
    }
}
