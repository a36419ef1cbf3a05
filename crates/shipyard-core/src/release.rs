//! The release job: changelog plus hosted release.
//!
//! The tag shape of the triggering ref decides everything:
//!
//! | ref | changelog | tag | prerelease | latest |
//! |---|---|---|---|---|
//! | `refs/tags/v1.2.3` | `--latest` | `v1.2.3` | no | yes |
//! | anything else (dispatch) | `--unreleased` | `nightly` | yes | no |
//!
//! Steps run strictly in order and the first failure ends the job.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::lock::{LockError, RunLock, lock_path};
use crate::runner::{ToolInvocation, ToolRunner};
use crate::step::{Step, StepError, StepEvent, StepReport, run_step, skip_step};
use crate::trigger::Trigger;

/// Tag used for releases that are not cut from a version tag.
pub const DEFAULT_NIGHTLY_TAG: &str = "nightly";

/// Environment variable git-cliff reads the repository identifier from.
pub const REPO_ENV: &str = "GITHUB_REPO";

/// Errors from the release job.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// A tool step failed.
    #[error(transparent)]
    Step(#[from] StepError),

    /// The release notes could not be written to a temporary file.
    #[error("failed to write release notes")]
    Notes(#[source] std::io::Error),

    /// Another run holds the release lock.
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Result alias for the release job.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Commit range the changelog covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangelogRange {
    /// Since the previous tag (`--latest`).
    Latest,
    /// Everything not yet released (`--unreleased`).
    Unreleased,
}

impl ChangelogRange {
    /// The git-cliff flag selecting this range.
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Latest => "--latest",
            Self::Unreleased => "--unreleased",
        }
    }
}

/// Release settings with config overrides applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseSettings {
    /// Repository identifier (`owner/name`) from config, if pinned there.
    pub repository: Option<String>,
    /// Tag for releases not cut from a version tag.
    pub nightly_tag: String,
    /// Hold an exclusive lock for the duration of the job.
    pub serialize_runs: bool,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            repository: None,
            nightly_tag: DEFAULT_NIGHTLY_TAG.to_string(),
            serialize_runs: false,
        }
    }
}

impl ReleaseSettings {
    /// Resolve settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut settings = Self::default();
        if let Some(ref release) = config.release {
            settings.repository.clone_from(&release.repository);
            if let Some(ref tag) = release.nightly_tag {
                settings.nightly_tag.clone_from(tag);
            }
            settings.serialize_runs = release.serialize_runs.unwrap_or(false);
        }
        settings
    }
}

/// Pick the repository identifier: config, then `GITHUB_REPOSITORY`, then
/// the `origin` remote.
pub fn resolve_repository(
    settings: &ReleaseSettings,
    lookup: impl Fn(&str) -> Option<String>,
    origin_url: impl FnOnce() -> Option<String>,
) -> Option<String> {
    settings
        .repository
        .clone()
        .or_else(|| lookup("GITHUB_REPOSITORY").filter(|r| !r.trim().is_empty()))
        .or_else(|| {
            let url = origin_url()?;
            crate::git::parse_owner_repo(&url).map(|(owner, repo)| format!("{owner}/{repo}"))
        })
}

/// Everything the release job decides before running a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    /// Tag the release is created under.
    pub tag_name: String,
    /// Changelog range.
    pub range: ChangelogRange,
    /// Mark the release as a prerelease.
    pub prerelease: bool,
    /// Mark the release as the repository's latest.
    pub make_latest: bool,
    /// Repository identifier handed to git-cliff.
    pub repository: Option<String>,
}

impl ReleasePlan {
    /// Apply the tag-shape decision table to a trigger.
    pub fn from_trigger(
        trigger: &Trigger,
        settings: &ReleaseSettings,
        repository: Option<String>,
    ) -> Self {
        let version_tag = trigger.is_version_tag();
        let tag_name = match trigger.git_ref.tag_name() {
            Some(tag) if version_tag => tag.to_string(),
            _ => settings.nightly_tag.clone(),
        };
        Self {
            tag_name,
            range: if version_tag {
                ChangelogRange::Latest
            } else {
                ChangelogRange::Unreleased
            },
            prerelease: !version_tag,
            make_latest: version_tag,
            repository,
        }
    }

    /// `git rev-parse --is-shallow-repository`.
    pub fn shallow_check_invocation() -> ToolInvocation {
        ToolInvocation::new("git")
            .args(["rev-parse", "--is-shallow-repository"])
            .captured()
    }

    /// `git fetch --unshallow --tags`.
    pub fn unshallow_invocation() -> ToolInvocation {
        ToolInvocation::new("git").args(["fetch", "--unshallow", "--tags"])
    }

    /// `git-cliff <range> --strip header`, output captured.
    pub fn changelog_invocation(&self) -> ToolInvocation {
        let inv = ToolInvocation::new("git-cliff")
            .args([self.range.flag(), "--strip", "header"])
            .captured();
        match self.repository {
            Some(ref repo) => inv.env(REPO_ENV, repo.as_str()),
            None => inv,
        }
    }

    /// `gh release create <tag> --notes-file <file> --latest=<bool> [--prerelease]`.
    pub fn release_invocation(&self, notes_file: &Utf8Path) -> ToolInvocation {
        let mut inv = ToolInvocation::new("gh")
            .args(["release", "create", self.tag_name.as_str()])
            .args(["--notes-file", notes_file.as_str()])
            .arg(format!("--latest={}", self.make_latest));
        if self.prerelease {
            inv = inv.arg("--prerelease");
        }
        inv.captured()
    }
}

/// Result of a release job.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    /// What was decided.
    pub plan: ReleasePlan,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Steps, in order.
    pub steps: Vec<StepReport>,
    /// Generated changelog text.
    pub notes: String,
    /// Release URL printed by `gh`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Runs the release job for a project root.
pub struct ReleaseJob<'a> {
    root: &'a Utf8Path,
    runner: &'a dyn ToolRunner,
    dry_run: bool,
    serialize_runs: bool,
}

impl<'a> ReleaseJob<'a> {
    /// Create a release job for the repository at `root`.
    pub const fn new(root: &'a Utf8Path, runner: &'a dyn ToolRunner) -> Self {
        Self {
            root,
            runner,
            dry_run: false,
            serialize_runs: false,
        }
    }

    /// Report steps instead of running them.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Hold the run lock while the job runs.
    #[must_use]
    pub const fn serialize_runs(mut self, serialize: bool) -> Self {
        self.serialize_runs = serialize;
        self
    }

    /// Run the job.
    #[instrument(skip_all, fields(tag = %plan.tag_name, dry_run = self.dry_run))]
    pub fn run(
        &self,
        plan: &ReleasePlan,
        on_event: &mut dyn FnMut(StepEvent),
    ) -> ReleaseResult<ReleaseOutcome> {
        let _lock = if self.serialize_runs && !self.dry_run {
            Some(RunLock::acquire(&lock_path(self.root))?)
        } else {
            None
        };

        if plan.repository.is_none() {
            warn!("no repository identifier; git-cliff runs without {REPO_ENV}");
        }

        let scope = "release";
        let mut steps = Vec::new();

        let (report, output) = run_step(
            &Step::new("history check", ReleasePlan::shallow_check_invocation()),
            scope,
            self.runner,
            self.root,
            self.dry_run,
            on_event,
        )?;
        steps.push(report);

        let unshallow = ReleasePlan::unshallow_invocation();
        if output.stdout.trim() == "true" {
            debug!("shallow clone, fetching full history");
            let (report, _) = run_step(
                &Step::new("fetch history", unshallow),
                scope,
                self.runner,
                self.root,
                self.dry_run,
                on_event,
            )?;
            steps.push(report);
        } else {
            let reason = if self.dry_run {
                "runs only when the clone is shallow"
            } else {
                "full history present"
            };
            steps.push(skip_step(
                scope,
                "fetch history",
                unshallow.to_string(),
                reason.to_string(),
                on_event,
            ));
        }

        let (report, output) = run_step(
            &Step::new("changelog", plan.changelog_invocation()),
            scope,
            self.runner,
            self.root,
            self.dry_run,
            on_event,
        )?;
        steps.push(report);
        let notes = output.stdout;

        let mut notes_file = tempfile::Builder::new()
            .prefix("shipyard-notes-")
            .suffix(".md")
            .tempfile()
            .map_err(ReleaseError::Notes)?;
        notes_file
            .write_all(notes.as_bytes())
            .and_then(|()| notes_file.flush())
            .map_err(ReleaseError::Notes)?;
        let notes_path = Utf8PathBuf::try_from(notes_file.path().to_path_buf())
            .map_err(|e| ReleaseError::Notes(e.into_io_error()))?;
        debug!(%notes_path, bytes = notes.len(), "wrote release notes");

        let (report, output) = run_step(
            &Step::new("create release", plan.release_invocation(&notes_path)),
            scope,
            self.runner,
            self.root,
            self.dry_run,
            on_event,
        )?;
        steps.push(report);

        let url = output
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(ToString::to_string);
        info!(tag = %plan.tag_name, ?url, "release job finished");

        Ok(ReleaseOutcome {
            plan: plan.clone(),
            dry_run: self.dry_run,
            steps,
            notes,
            url,
        })
    }
}
