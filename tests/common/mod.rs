//! Shared test utilities for integration and E2E tests.
//!
//! This module builds throwaway git setups that look like a real upstream
//! merge environment: for every project there is a bare "server" repository
//! with a `master` and a `master-chromium` branch, a seed repository used to
//! author new commits on either branch, and a clone under the repository root
//! whose remote is called `goog`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = UpstreamFixture::new();
//! fixture.add_project("external/chromium", &[("a.txt", "a")]);
//! fixture.upstream_commit("external/chromium", &[("b.txt", "b")], "Add b");
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, marker_message, UpstreamFixture};
}

/// Runs git in `dir` and returns trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A commit message carrying an upstream revision marker.
#[allow(dead_code)]
pub fn marker_message(subject: &str, marker: &str, revision: u32) -> String {
    format!(
        "{}\n\n{}: http://src.example.org/svn/trunk/src@{} 0039d316-1c4b-4281-b951-d872f2087c98",
        subject, marker, revision
    )
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

/// A temporary repository root with seed, server and clone repositories.
pub struct UpstreamFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl UpstreamFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("root")).unwrap();
        Self { temp_dir }
    }

    /// The directory project paths are relative to.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("root")
    }

    /// The clone the tool operates on.
    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    pub fn server_dir(&self, name: &str) -> PathBuf {
        self.temp_dir
            .path()
            .join("server")
            .join(format!("{}.git", name.replace('/', "_")))
    }

    fn seed_dir(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("seed").join(name.replace('/', "_"))
    }

    /// Creates a project whose `master` and `master-chromium` branches both
    /// point at one initial commit, and clones it under the root.
    pub fn add_project(&self, name: &str, files: &[(&str, &str)]) {
        let seed = self.seed_dir(name);
        let server = self.server_dir(name);
        fs::create_dir_all(&seed).unwrap();
        fs::create_dir_all(&server).unwrap();

        git(&seed, &["init", "-b", "master"]);
        configure_identity(&seed);
        write_files(&seed, files);
        git(&seed, &["add", "-A"]);
        git(&seed, &["commit", "--allow-empty", "-m", "Initial commit"]);
        git(&seed, &["branch", "master-chromium"]);

        git(&server, &["init", "--bare", "-b", "master"]);
        git(&seed, &["remote", "add", "goog", server.to_str().unwrap()]);
        git(&seed, &["push", "goog", "master", "master-chromium"]);

        let project = self.project_dir(name);
        fs::create_dir_all(project.parent().unwrap()).unwrap();
        git(
            &self.root(),
            &[
                "clone",
                "-o",
                "goog",
                server.to_str().unwrap(),
                project.to_str().unwrap(),
            ],
        );
        configure_identity(&project);
    }

    fn commit_on(&self, name: &str, branch: &str, files: &[(&str, &str)], message: &str) -> String {
        let seed = self.seed_dir(name);
        git(&seed, &["checkout", branch]);
        git(&seed, &["pull", "--ff-only", "goog", branch]);
        write_files(&seed, files);
        git(&seed, &["add", "-A"]);
        git(&seed, &["commit", "--allow-empty", "-m", message]);
        git(&seed, &["push", "goog", branch]);
        git(&self.project_dir(name), &["fetch", "goog"]);
        git(&seed, &["rev-parse", "HEAD"])
    }

    /// Adds a commit to the upstream branch and fetches it into the clone.
    pub fn upstream_commit(&self, name: &str, files: &[(&str, &str)], message: &str) -> String {
        self.commit_on(name, "master-chromium", files, message)
    }

    /// Adds a commit to the target branch and fetches it into the clone.
    pub fn target_commit(&self, name: &str, files: &[(&str, &str)], message: &str) -> String {
        self.commit_on(name, "master", files, message)
    }

    /// Publishes the clone's working branch as the new target branch.
    pub fn publish_working_branch(&self, name: &str) {
        let project = self.project_dir(name);
        git(&project, &["push", "goog", "merge-to-master:master"]);
        git(&project, &["fetch", "goog"]);
    }

    pub fn write_config(&self, yaml: &str) -> PathBuf {
        let path = self.root().join(".upstream-merge.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    pub fn git(&self, name: &str, args: &[&str]) -> String {
        git(&self.project_dir(name), args)
    }

    /// Number of first-parent commits on HEAD that are not on the target.
    pub fn new_commit_count(&self, name: &str) -> usize {
        self.git(
            name,
            &["rev-list", "--first-parent", "--count", "goog/master..HEAD"],
        )
        .parse()
        .unwrap()
    }

    pub fn merge_log(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.project_dir(name).join(".merged-revisions")).ok()
    }

    pub fn tracked_files(&self, name: &str) -> Vec<String> {
        self.git(name, &["ls-tree", "-r", "--name-only", "HEAD"])
            .lines()
            .map(str::to_string)
            .collect()
    }
}
