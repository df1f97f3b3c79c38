//! CLI argument parsing and pipeline dispatch

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use console::style;

use upstream_merge::config;
use upstream_merge::defaults::{self, ROOT_ENV_VAR};
use upstream_merge::error::Error;
use upstream_merge::merger::{MergeContext, MergeOutcome, MergeState};
use upstream_merge::output::OutputConfig;
use upstream_merge::publish::{GitPusher, PublishReport, Publisher, PushResult};

/// Upstream Merge - Merge upstream tracking branches into the target branch
#[derive(Parser, Debug)]
#[command(name = "upstream-merge")]
#[command(version, about, long_about = None)]
#[command(after_help = "Takes the upstream branch of every configured project and merges it into \
the target branch, flattening the history of flat-history projects, then pushes the result.")]
pub struct Cli {
    /// Automatically push the result to the server without prompting if the
    /// merge was successful
    #[arg(long)]
    autopush: bool,

    /// Path to the configuration file (defaults to .upstream-merge.yaml in the
    /// repository root)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    // Positional arguments are rejected with usage and exit code 1.
    #[arg(hide = true)]
    unexpected: Vec<String>,
}

impl Cli {
    /// Execute the merge pipeline
    pub fn execute(self) -> Result<()> {
        if !self.unexpected.is_empty() {
            Cli::command().print_help()?;
            std::process::exit(1);
        }

        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);
        output.apply();

        let root = env::var_os(ROOT_ENV_VAR)
            .map(PathBuf::from)
            .ok_or_else(|| Error::MissingEnvironment {
                variable: ROOT_ENV_VAR.to_string(),
                hint: Some("Set it to the directory the configured project paths are relative to".to_string()),
            })?;

        let config_path = self
            .config
            .unwrap_or_else(|| defaults::default_config_path(&root));
        let config = config::from_file(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            )
        })?;

        let context = MergeContext::new(root, config);
        let report = Publisher::new(&context, GitPusher)
            .with_progress(&print_progress)
            .publish(self.autopush)?;
        print_report(&output, &context, &report);
        Ok(())
    }
}

fn init_logging(level: &str) {
    // RUST_LOG still wins when set.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn print_progress(path: &str, state: MergeState) {
    match state {
        MergeState::Merging => println!("Merging project {} ...", style(path).cyan()),
        MergeState::UpToDate => {
            println!("No new commits to merge in project {}", style(path).cyan())
        }
        _ => {}
    }
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}

fn print_report(output: &OutputConfig, context: &MergeContext, report: &PublishReport) {
    let config = context.config();
    let done = output.symbol("✓", "[ok]");
    println!(
        "\n{} at upstream revision r{}",
        style(&config.source).bold(),
        report.revision
    );

    for project in &report.projects {
        match &project.outcome {
            MergeOutcome::UpToDate => {
                println!(
                    "  {} {}: no new commits",
                    style(output.symbol("=", "[--]")).dim(),
                    project.path
                );
            }
            MergeOutcome::Merged { commit } => {
                println!(
                    "  {} {}: merged as {}",
                    style(done).green(),
                    project.path,
                    short(commit)
                );
            }
            MergeOutcome::Flattened {
                commit,
                record_commit,
                ..
            } => {
                println!(
                    "  {} {}: squashed as {}, recorded in {}",
                    style(done).green(),
                    project.path,
                    short(commit),
                    short(record_commit)
                );
            }
        }
    }

    match report.push {
        PushResult::Pushed => println!(
            "\n{} Pushed {} to {}/{}",
            output.symbol("✅", "[pushed]"),
            config.working_branch, config.remote, config.target_branch
        ),
        PushResult::Declined => println!(
            "\n{} Not pushed. The merges are on the local {} branch of each project.",
            output.symbol("ℹ️ ", "[info]"),
            config.working_branch
        ),
    }
}
