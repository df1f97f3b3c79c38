//! End-to-end tests for the `upstream-merge` binary.
//!
//! - Exit code 0: Success
//! - Exit code 1: Any error, including positional arguments and a missing
//!   `UPSTREAM_MERGE_ROOT`
//! - Exit code 2: Unknown flags (handled by clap)

mod common;

use common::prelude::*;

const CHROMIUM: &str = "external/chromium";
const SKIA: &str = "external/skia";

#[test]
fn test_help() {
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("--autopush"));
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.arg("--version").assert().code(0);
}

#[test]
fn test_positional_argument_prints_usage() {
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", "/tmp")
        .arg("unexpected")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_unknown_flag() {
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.arg("--unknown-flag-that-does-not-exist")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_missing_root_environment() {
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env_remove("UPSTREAM_MERGE_ROOT")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("UPSTREAM_MERGE_ROOT"));
}

#[test]
fn test_missing_config_file() {
    let fixture = UpstreamFixture::new();
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", fixture.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_invalid_config_file() {
    let fixture = UpstreamFixture::new();
    fixture.write_config("projects: []\n");
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", fixture.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No projects configured"));
}

#[test]
fn test_autopush_publishes_merges() {
    let fixture = UpstreamFixture::new();
    fixture.add_project(CHROMIUM, &[("a.txt", "a")]);
    fixture.add_project(SKIA, &[("a.txt", "a")]);
    fixture.upstream_commit(
        CHROMIUM,
        &[("b.txt", "b")],
        &marker_message("Roll", "git-svn-id", 178112),
    );
    fixture.write_config(&format!(
        "source: Chromium\nprojects:\n  - flat:\n      path: {}\n  - full:\n      path: {}\n",
        CHROMIUM, SKIA
    ));
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", fixture.root())
        .arg("--autopush")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("r178112"))
        .stdout(predicate::str::contains("Pushed merge-to-master to goog/master"));

    let server = fixture.server_dir(CHROMIUM);
    assert_eq!(
        git(&server, &["log", "-1", "--format=%s", "master"]),
        "Record merge at revision r178112"
    );
    assert_eq!(
        git(&server, &["rev-parse", "master"]),
        fixture.git(CHROMIUM, &["rev-parse", "merge-to-master"])
    );

    // Nothing was pending for skia, so its target is unchanged.
    let skia_server = fixture.server_dir(SKIA);
    assert_eq!(
        git(&skia_server, &["log", "-1", "--format=%s", "master"]),
        "Initial commit"
    );
}

#[test]
fn test_conflict_exits_nonzero_and_pushes_nothing() {
    let fixture = UpstreamFixture::new();
    fixture.add_project(CHROMIUM, &[("a.txt", "base\n")]);
    let target = fixture.target_commit(CHROMIUM, &[("a.txt", "ours\n")], "Ours");
    fixture.upstream_commit(
        CHROMIUM,
        &[("a.txt", "theirs\n")],
        &marker_message("Theirs", "git-svn-id", 5),
    );
    fixture.write_config(&format!("projects:\n  - flat:\n      path: {}\n", CHROMIUM));
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", fixture.root())
        .arg("--autopush")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unresolved merge conflicts"));

    assert_eq!(
        git(&fixture.server_dir(CHROMIUM), &["rev-parse", "master"]),
        target
    );
}

#[test]
fn test_explicit_config_path() {
    let fixture = UpstreamFixture::new();
    fixture.add_project(SKIA, &[("a.txt", "a")]);
    fixture.upstream_commit(SKIA, &[("b.txt", "b")], "Roll\n\nupstream-id: foo@12345");
    let config = fixture.root().join("custom.yaml");
    std::fs::write(
        &config,
        format!("marker: upstream-id\nprojects:\n  - full:\n      path: {}\n", SKIA),
    )
    .unwrap();
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", fixture.root())
        .arg("--autopush")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("r12345"));

    assert_eq!(
        git(&fixture.server_dir(SKIA), &["log", "-1", "--format=%s", "master"]),
        "Merge from upstream at revision r12345"
    );
}

#[test]
fn test_progress_lines_go_to_stdout() {
    let fixture = UpstreamFixture::new();
    fixture.add_project(CHROMIUM, &[("a.txt", "a")]);
    fixture.add_project(SKIA, &[("a.txt", "a")]);
    fixture.upstream_commit(
        CHROMIUM,
        &[("b.txt", "b")],
        &marker_message("Roll", "git-svn-id", 9),
    );
    fixture.write_config(&format!(
        "projects:\n  - flat:\n      path: {}\n  - full:\n      path: {}\n",
        CHROMIUM, SKIA
    ));
    let mut cmd = cargo_bin_cmd!("upstream-merge");

    cmd.env("UPSTREAM_MERGE_ROOT", fixture.root())
        .args(["--autopush", "--color", "never", "--log-level", "warn"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Merging project external/chromium ..."))
        .stdout(predicate::str::contains(
            "No new commits to merge in project external/skia",
        ));
}
