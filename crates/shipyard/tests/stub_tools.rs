//! End-to-end runs against stub `uv`, `uvx`, `git`, `git-cliff` and `gh`.
//!
//! Each stub appends its name and arguments to a log file, so the tests can
//! check which tools ran, in which order, and with which flags.
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STUB: &str = r#"#!/bin/sh
name=$(basename "$0")
echo "$name $*" >> "$STUB_LOG"
case "$name $*" in
  "git rev-parse --is-shallow-repository")
    echo "${STUB_SHALLOW:-false}" ;;
  "git rev-parse --abbrev-ref HEAD")
    echo main ;;
  "git remote get-url origin")
    echo git@github.com:acme/widgets.git ;;
  "git-cliff "*)
    echo "env GITHUB_REPO=$GITHUB_REPO" >> "$STUB_LOG"
    printf '## Changes\n\n- add widgets\n' ;;
  "gh "*)
    if [ -n "$STUB_GH_FAIL" ]; then
      echo "release already exists" >&2
      exit 1
    fi
    echo "https://github.com/acme/widgets/releases/tag/$3" ;;
  "uv sync"*)
    mkdir -p .venv ;;
  "uv run pre-commit"*)
    if [ -n "$STUB_PRECOMMIT_FAIL" ]; then
      exit 1
    fi ;;
esac
exit 0
"#;

const TOOLS: &[&str] = &["uv", "uvx", "git", "git-cliff", "gh"];

/// A Python project directory with stub tools first on `PATH`.
struct Project {
    tmp: TempDir,
}

impl Project {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        let root = tmp.path().join("project");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("pyproject.toml"), "[project]\nname = \"widgets\"\n").unwrap();

        for tool in TOOLS {
            let path = bin.join(tool);
            fs::write(&path, STUB).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        Self { tmp }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join("project")
    }

    fn log_path(&self) -> PathBuf {
        self.tmp.path().join("calls.log")
    }

    /// Every logged stub call, one per line.
    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn clear_calls(&self) {
        let _ = fs::remove_file(self.log_path());
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let path = std::env::var("PATH").unwrap_or_default();
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.current_dir(self.root())
            .env("PATH", format!("{}:{path}", self.tmp.path().join("bin").display()))
            .env("STUB_LOG", self.log_path())
            .env("XDG_CONFIG_HOME", self.tmp.path().join("config"))
            .env("SHIPYARD_LOG_DIR", self.tmp.path().join("logs"))
            .env_remove("SHIPYARD_LOG_PATH")
            .env_remove("GITHUB_EVENT_NAME")
            .env_remove("GITHUB_REF")
            .env_remove("GITHUB_REPOSITORY")
            .env_remove("STUB_GH_FAIL")
            .env_remove("STUB_PRECOMMIT_FAIL")
            .env_remove("STUB_SHALLOW");
        cmd
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().args(args).arg("--json").assert().success();
        serde_json::from_slice(&output.get_output().stdout).expect("valid JSON report")
    }
}

fn index_of(calls: &[String], prefix: &str) -> usize {
    calls
        .iter()
        .position(|c| c.starts_with(prefix))
        .unwrap_or_else(|| panic!("no call starting with `{prefix}` in {calls:#?}"))
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

// =============================================================================
// Tasks
// =============================================================================

#[test]
fn restore_env_is_a_no_op_the_second_time() {
    let project = Project::new();

    project
        .cmd()
        .arg("restore-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("ran: uv sync --all-groups"));
    assert_eq!(project.calls(), ["uv sync --all-groups"]);
    assert!(project.root().join(".venv").is_dir());

    project.clear_calls();
    project
        .cmd()
        .arg("restore-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    assert!(project.calls().is_empty());
}

#[test]
fn restore_env_sync_mode_flag() {
    let project = Project::new();
    project
        .cmd()
        .args(["restore-env", "--sync", "frozen-no-dev"])
        .assert()
        .success();
    assert_eq!(project.calls(), ["uv sync --no-dev --frozen"]);
}

#[test]
fn bump_version_runs_dependency_then_steps_in_order() {
    let project = Project::new();
    let report = project.json(&["v"]);
    assert_eq!(report["task"], "bump-version");

    let calls = project.calls();
    let sync = index_of(&calls, "uv sync");
    let bump = index_of(&calls, "uv run cz bump");
    let checks = index_of(&calls, "uv run pre-commit run --all-files");
    let amend = index_of(&calls, "git commit --all --amend --no-edit --no-verify");
    assert!(sync < bump && bump < checks && checks < amend, "{calls:#?}");
}

#[test]
fn bump_version_tolerates_failing_checks() {
    let project = Project::new();
    fs::create_dir(project.root().join(".venv")).unwrap();

    let output = project
        .cmd()
        .env("STUB_PRECOMMIT_FAIL", "1")
        .args(["bump-version", "--json"])
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let statuses: Vec<_> = report["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap().to_string())
        .collect();
    assert!(statuses.contains(&"tolerated".to_string()), "{statuses:?}");
    assert_eq!(project.calls_starting_with("git commit").len(), 1);
}

#[test]
fn precommit_run_all_fails_on_failing_checks() {
    let project = Project::new();
    fs::create_dir(project.root().join(".venv")).unwrap();

    project
        .cmd()
        .env("STUB_PRECOMMIT_FAIL", "1")
        .arg("precommit-run-all")
        .assert()
        .failure()
        .stderr(predicate::str::contains("precommit-run-all failed"));
}

#[test]
fn precommit_run_all_twice_runs_the_same_check_twice() {
    let project = Project::new();
    fs::create_dir(project.root().join(".venv")).unwrap();

    project.cmd().arg("precommit-run-all").assert().success();
    project.cmd().arg("precommit-run-all").assert().success();

    assert_eq!(
        project.calls(),
        [
            "uv run pre-commit run --all-files",
            "uv run pre-commit run --all-files"
        ]
    );
}

#[test]
fn clean_removes_targets_and_tolerates_absent_ones() {
    let project = Project::new();
    let root = project.root();
    write(&root.join("dist/widgets-1.0.0.tar.gz"), "");
    write(&root.join("build/lib/widgets.py"), "");

    project.cmd().arg("clean").assert().success();
    assert_eq!(project.calls(), ["uvx cleanpy@0.5.1 ."]);
    assert!(!root.join("dist").exists());
    assert!(!root.join("build").exists());
    assert!(root.join("pyproject.toml").exists());

    project
        .cmd()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("already absent"));
}

#[test]
fn clean_with_tool_disabled_only_removes() {
    let project = Project::new();
    let root = project.root();
    write(&root.join(".shipyard.toml"), "[tasks.clean]\ntool = []\n");
    write(&root.join("dist/x.whl"), "");

    project.cmd().arg("clean").assert().success();
    assert!(project.calls().is_empty());
    assert!(!root.join("dist").exists());
}

#[test]
fn dry_run_runs_nothing() {
    let project = Project::new();
    write(&project.root().join("dist/x.whl"), "");

    project
        .cmd()
        .args(["clean", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing executed"));
    assert!(project.calls().is_empty());
    assert!(project.root().join("dist").exists());
}

// =============================================================================
// Release
// =============================================================================

#[test]
fn release_for_version_tag() {
    let project = Project::new();
    let report = project.json(&["release", "--event", "push", "--tag", "v1.2.3"]);

    assert_eq!(report["plan"]["tag_name"], "v1.2.3");
    assert_eq!(report["plan"]["range"], "latest");
    assert_eq!(report["plan"]["prerelease"], false);
    assert_eq!(report["plan"]["make_latest"], true);
    assert_eq!(
        report["url"],
        "https://github.com/acme/widgets/releases/tag/v1.2.3"
    );
    assert!(report["notes"].as_str().unwrap().contains("add widgets"));

    let calls = project.calls();
    assert!(calls.contains(&"git-cliff --latest --strip header".to_string()));
    assert!(calls.contains(&"env GITHUB_REPO=acme/widgets".to_string()));
    let gh = &project.calls_starting_with("gh release create v1.2.3 --notes-file")[0];
    assert!(gh.ends_with("--latest=true"), "{gh}");
    assert!(project.calls_starting_with("git fetch").is_empty());
}

#[test]
fn release_for_manual_dispatch_on_branch() {
    let project = Project::new();
    let report = project.json(&["release"]);

    assert_eq!(report["plan"]["tag_name"], "nightly");
    assert_eq!(report["plan"]["range"], "unreleased");
    assert_eq!(report["plan"]["prerelease"], true);
    assert_eq!(report["plan"]["make_latest"], false);

    assert!(
        project
            .calls()
            .contains(&"git-cliff --unreleased --strip header".to_string())
    );
    let gh = &project.calls_starting_with("gh release create nightly")[0];
    assert!(gh.ends_with("--latest=false --prerelease"), "{gh}");
}

#[test]
fn release_reads_ci_variables() {
    let project = Project::new();
    let output = project
        .cmd()
        .env("GITHUB_EVENT_NAME", "push")
        .env("GITHUB_REF", "refs/tags/v2.0.0")
        .env("GITHUB_REPOSITORY", "ci/repo")
        .args(["release", "--json"])
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(report["plan"]["tag_name"], "v2.0.0");
    assert_eq!(report["plan"]["repository"], "ci/repo");
}

#[test]
fn release_unshallows_shallow_clone() {
    let project = Project::new();
    project
        .cmd()
        .env("STUB_SHALLOW", "true")
        .args(["release", "--tag", "v1.0.0"])
        .assert()
        .success();
    let calls = project.calls();
    assert!(
        index_of(&calls, "git fetch --unshallow --tags") < index_of(&calls, "git-cliff"),
        "{calls:#?}"
    );
}

#[test]
fn release_failure_exits_non_zero_with_stderr() {
    let project = Project::new();
    project
        .cmd()
        .env("STUB_GH_FAIL", "1")
        .args(["release", "--tag", "v1.2.3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("release already exists"));
}

// =============================================================================
// Publish & Workflow
// =============================================================================

#[test]
fn publish_is_skipped_for_branches() {
    let project = Project::new();
    let report = project.json(&["publish", "--ref", "refs/heads/main"]);
    assert_eq!(report["status"], "skipped");
    assert!(project.calls_starting_with("uv").is_empty());
}

#[test]
fn publish_for_version_tag() {
    let project = Project::new();
    let report = project.json(&["publish", "--event", "push", "--tag", "v1.2.3"]);
    assert_eq!(report["status"], "published");
    assert_eq!(report["tag"], "v1.2.3");

    assert_eq!(
        project.calls(),
        [
            "uv python install",
            "uv sync --all-groups",
            "uv build",
            "uv publish --trusted-publishing always",
        ]
    );
}

#[test]
fn workflow_runs_publish_after_failed_release() {
    let project = Project::new();
    project
        .cmd()
        .env("STUB_GH_FAIL", "1")
        .args(["workflow", "--event", "push", "--tag", "v1.2.3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("release job failed"));

    let calls = project.calls();
    assert!(index_of(&calls, "gh release create") < index_of(&calls, "uv build"));
    assert!(calls.contains(&"uv publish --trusted-publishing always".to_string()));
}

#[test]
fn workflow_on_branch_releases_nightly_only() {
    let project = Project::new();
    let report = project.json(&["workflow"]);
    assert_eq!(report["release"]["status"], "succeeded");
    assert_eq!(report["release"]["report"]["plan"]["tag_name"], "nightly");
    assert_eq!(report["publish"]["report"]["status"], "skipped");
    assert!(project.calls_starting_with("uv").is_empty());
}
