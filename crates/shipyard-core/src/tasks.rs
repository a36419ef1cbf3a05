//! Local developer tasks.
//!
//! Four named tasks wrap the day-to-day `uv` workflow of a Python package:
//!
//! | Task | Depends on | Steps |
//! |---|---|---|
//! | `restore-env` | | `uv sync` unless the environment directory exists |
//! | `bump-version` (`v`) | `restore-env` | `cz bump`, pre-commit (tolerated), amend commit |
//! | `clean` | `restore-env` (opt-in) | cleanup tool, then remove artifact targets |
//! | `precommit-run-all` | `restore-env` | `pre-commit run --all-files` |
//!
//! Dependencies run first, at most once per invocation.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::runner::{ToolInvocation, ToolRunner};
use crate::step::{Step, StepError, StepEvent, StepOutcome, StepReport, run_steps, skip_step};

/// Default environment directory checked by `restore-env`.
pub const DEFAULT_ENV_DIR: &str = ".venv";

/// Default cleanup tool, run ephemerally through `uvx` at a pinned version.
pub const DEFAULT_CLEAN_TOOL: &[&str] = &["uvx", "cleanpy@0.5.1", "."];

/// Default artifact targets removed by `clean`.
pub const DEFAULT_CLEAN_TARGETS: &[&str] = &[
    "build",
    "dist",
    ".pytest_cache",
    ".ruff_cache",
    ".mypy_cache",
];

/// Errors from running a task.
#[derive(Error, Debug)]
pub enum TaskError {
    /// A step of the task failed.
    #[error("task `{task}` failed")]
    Step {
        /// The task (or dependency) that was running.
        task: TaskName,
        /// The failing step.
        #[source]
        source: StepError,
    },

    /// An artifact target could not be removed.
    #[error("failed to remove `{path}`")]
    Remove {
        /// Absolute path of the target.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A clean target points outside the project root.
    #[error("clean target `{0}` must be a relative path inside the project")]
    UnsafeTarget(Utf8PathBuf),

    /// The name does not match any task.
    #[error("unknown task `{0}` (expected one of: restore-env, bump-version, v, clean, precommit-run-all)")]
    Unknown(String),
}

/// Result alias for task execution.
pub type TaskResult<T> = Result<T, TaskError>;

/// The named developer tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskName {
    /// Create the dependency environment if it is missing.
    RestoreEnv,
    /// Bump the version from conventional commits and amend the release commit.
    BumpVersion,
    /// Remove build and cache artifacts.
    Clean,
    /// Run every pre-commit hook across the whole tree.
    PrecommitRunAll,
}

impl TaskName {
    /// All tasks, in the order they are listed to users.
    pub const ALL: [Self; 4] = [
        Self::RestoreEnv,
        Self::BumpVersion,
        Self::Clean,
        Self::PrecommitRunAll,
    ];

    /// The task's command name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RestoreEnv => "restore-env",
            Self::BumpVersion => "bump-version",
            Self::Clean => "clean",
            Self::PrecommitRunAll => "precommit-run-all",
        }
    }

    /// Short alias, if the task has one.
    pub const fn alias(self) -> Option<&'static str> {
        match self {
            Self::BumpVersion => Some("v"),
            _ => None,
        }
    }

    /// Tasks that must complete before this one, in run order.
    pub fn dependencies(self, settings: &TaskSettings) -> Vec<Self> {
        let restore = match self {
            Self::RestoreEnv => false,
            Self::BumpVersion => settings.bump_restore_env,
            Self::Clean => settings.clean_restore_env,
            Self::PrecommitRunAll => settings.precommit_restore_env,
        };
        if restore {
            vec![Self::RestoreEnv]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskName {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task| task.as_str() == s || task.alias() == Some(s))
            .ok_or_else(|| TaskError::Unknown(s.to_string()))
    }
}

/// How `restore-env` installs dependencies.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Every dependency group, lock file updated as needed (`--all-groups`).
    #[default]
    AllGroups,
    /// Runtime dependencies only, exactly as locked (`--no-dev --frozen`).
    FrozenNoDev,
}

impl SyncMode {
    /// Arguments appended to `uv sync`.
    pub const fn sync_args(self) -> &'static [&'static str] {
        match self {
            Self::AllGroups => &["--all-groups"],
            Self::FrozenNoDev => &["--no-dev", "--frozen"],
        }
    }

    /// Name as written in config files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllGroups => "all-groups",
            Self::FrozenNoDev => "frozen-no-dev",
        }
    }
}

/// Task settings with config overrides applied over the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSettings {
    /// Environment directory, relative to the project root.
    pub env_dir: Utf8PathBuf,
    /// Install mode for `uv sync`.
    pub sync: SyncMode,
    /// Whether `bump-version` runs `restore-env` first.
    pub bump_restore_env: bool,
    /// Whether the amend in `bump-version` skips commit hooks.
    pub bump_no_verify: bool,
    /// Cleanup tool argv; `None` disables it.
    pub clean_tool: Option<Vec<String>>,
    /// Whether `clean` runs `restore-env` first.
    pub clean_restore_env: bool,
    /// Paths removed by `clean`, relative to the project root.
    pub clean_targets: Vec<Utf8PathBuf>,
    /// Whether `precommit-run-all` runs `restore-env` first.
    pub precommit_restore_env: bool,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            env_dir: Utf8PathBuf::from(DEFAULT_ENV_DIR),
            sync: SyncMode::default(),
            bump_restore_env: true,
            bump_no_verify: true,
            clean_tool: Some(DEFAULT_CLEAN_TOOL.iter().map(ToString::to_string).collect()),
            clean_restore_env: false,
            clean_targets: DEFAULT_CLEAN_TARGETS.iter().map(Utf8PathBuf::from).collect(),
            precommit_restore_env: true,
        }
    }
}

impl TaskSettings {
    /// Resolve settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut settings = Self::default();
        let Some(tasks) = config.tasks.as_ref() else {
            return settings;
        };

        if let Some(ref dir) = tasks.env_dir {
            settings.env_dir.clone_from(dir);
        }
        if let Some(sync) = tasks.sync {
            settings.sync = sync;
        }
        if let Some(ref bump) = tasks.bump {
            settings.bump_restore_env = bump.restore_env.unwrap_or(settings.bump_restore_env);
            settings.bump_no_verify = bump.no_verify.unwrap_or(settings.bump_no_verify);
        }
        if let Some(ref clean) = tasks.clean {
            if let Some(ref tool) = clean.tool {
                // An empty list disables the tool.
                settings.clean_tool = (!tool.is_empty()).then(|| tool.clone());
            }
            settings.clean_restore_env = clean.restore_env.unwrap_or(settings.clean_restore_env);
            if let Some(ref targets) = clean.targets {
                settings.clean_targets.clone_from(targets);
            }
        }
        if let Some(ref precommit) = tasks.precommit {
            settings.precommit_restore_env = precommit
                .restore_env
                .unwrap_or(settings.precommit_restore_env);
        }
        settings
    }
}

/// `uv sync` with the install mode's flags.
pub fn sync_invocation(mode: SyncMode) -> ToolInvocation {
    ToolInvocation::new("uv")
        .arg("sync")
        .args(mode.sync_args().iter().copied())
}

/// `uv run pre-commit run --all-files`.
pub fn precommit_invocation() -> ToolInvocation {
    ToolInvocation::new("uv").args(["run", "pre-commit", "run", "--all-files"])
}

/// The tool steps of a task, excluding dependencies.
///
/// `restore-env` always plans its sync step; whether it runs is decided
/// against the filesystem at execution time. `clean` plans only its tool
/// step here; target removal is native.
pub fn plan_task(task: TaskName, settings: &TaskSettings) -> Vec<Step> {
    match task {
        TaskName::RestoreEnv => vec![Step::new("sync", sync_invocation(settings.sync))],
        TaskName::BumpVersion => {
            let mut amend =
                ToolInvocation::new("git").args(["commit", "--all", "--amend", "--no-edit"]);
            if settings.bump_no_verify {
                amend = amend.arg("--no-verify");
            }
            vec![
                Step::new("bump", ToolInvocation::new("uv").args(["run", "cz", "bump"])),
                // Hooks that rewrite files exit non-zero; the amend folds the rewrites in.
                Step::tolerant("pre-commit", precommit_invocation()),
                Step::new("amend", amend),
            ]
        }
        TaskName::Clean => settings
            .clean_tool
            .as_deref()
            .and_then(ToolInvocation::from_argv)
            .map(|inv| vec![Step::new("cleanup tool", inv)])
            .unwrap_or_default(),
        TaskName::PrecommitRunAll => vec![Step::new("pre-commit", precommit_invocation())],
    }
}

/// Result of running a task and its dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    /// The requested task.
    pub task: TaskName,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Every step, dependencies first.
    pub steps: Vec<StepReport>,
}

/// Runs tasks against a project root.
pub struct TaskRunner<'a> {
    root: &'a Utf8Path,
    settings: &'a TaskSettings,
    runner: &'a dyn ToolRunner,
    dry_run: bool,
}

impl<'a> TaskRunner<'a> {
    /// Create a task runner for the project at `root`.
    pub const fn new(
        root: &'a Utf8Path,
        settings: &'a TaskSettings,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            root,
            settings,
            runner,
            dry_run: false,
        }
    }

    /// Report steps instead of running them.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run `task` after its dependencies.
    #[instrument(skip(self, on_event), fields(root = %self.root, dry_run = self.dry_run))]
    pub fn run(
        &self,
        task: TaskName,
        on_event: &mut dyn FnMut(StepEvent),
    ) -> TaskResult<TaskOutcome> {
        if task == TaskName::Clean {
            check_clean_targets(&self.settings.clean_targets)?;
        }

        let mut done = Vec::new();
        let mut steps = Vec::new();

        for dep in task.dependencies(self.settings) {
            if !done.contains(&dep) {
                debug!(%task, dependency = %dep, "running dependency");
                steps.extend(self.run_single(dep, on_event)?);
                done.push(dep);
            }
        }
        steps.extend(self.run_single(task, on_event)?);

        info!(%task, steps = steps.len(), "task finished");
        Ok(TaskOutcome {
            task,
            dry_run: self.dry_run,
            steps,
        })
    }

    fn run_single(
        &self,
        task: TaskName,
        on_event: &mut dyn FnMut(StepEvent),
    ) -> TaskResult<Vec<StepReport>> {
        let scope = task.as_str();
        let step_err = |source: StepError| TaskError::Step { task, source };

        match task {
            TaskName::RestoreEnv => {
                let env_dir = self.root.join(&self.settings.env_dir);
                if env_dir.exists() {
                    debug!(%env_dir, "environment present, skipping sync");
                    let step = sync_invocation(self.settings.sync);
                    return Ok(vec![skip_step(
                        scope,
                        "sync",
                        step.to_string(),
                        format!("`{}` already exists", self.settings.env_dir),
                        on_event,
                    )]);
                }
                run_steps(
                    &plan_task(task, self.settings),
                    scope,
                    self.runner,
                    self.root,
                    self.dry_run,
                    on_event,
                )
                .map_err(step_err)
            }
            TaskName::Clean => {
                let mut reports = match self.settings.clean_tool.as_deref() {
                    Some(argv) if !argv.is_empty() => run_steps(
                        &plan_task(task, self.settings),
                        scope,
                        self.runner,
                        self.root,
                        self.dry_run,
                        on_event,
                    )
                    .map_err(step_err)?,
                    _ => vec![skip_step(
                        scope,
                        "cleanup tool",
                        String::new(),
                        "disabled in config".to_string(),
                        on_event,
                    )],
                };
                for target in &self.settings.clean_targets {
                    reports.push(self.remove_target(target, on_event)?);
                }
                Ok(reports)
            }
            TaskName::BumpVersion | TaskName::PrecommitRunAll => run_steps(
                &plan_task(task, self.settings),
                scope,
                self.runner,
                self.root,
                self.dry_run,
                on_event,
            )
            .map_err(step_err),
        }
    }

    fn remove_target(
        &self,
        target: &Utf8Path,
        on_event: &mut dyn FnMut(StepEvent),
    ) -> TaskResult<StepReport> {
        let scope = TaskName::Clean.as_str();
        let name = format!("remove {target}");
        let command = format!("rm -rf {target}");
        let path = self.root.join(target);

        let Ok(meta) = path.symlink_metadata() else {
            return Ok(skip_step(
                scope,
                &name,
                command,
                "already absent".to_string(),
                on_event,
            ));
        };

        on_event(StepEvent::Started {
            scope: scope.to_string(),
            step: name.clone(),
            command: command.clone(),
        });

        let message = if self.dry_run {
            format!("would remove {target}")
        } else {
            let removed = if meta.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|source| TaskError::Remove {
                path: path.clone(),
                source,
            })?;
            debug!(%path, "removed");
            format!("removed {target}")
        };

        let report = StepReport {
            scope: scope.to_string(),
            name,
            command,
            outcome: StepOutcome::Success { message },
        };
        on_event(StepEvent::Completed(report.clone()));
        Ok(report)
    }
}

/// Every clean target must be a plain relative path inside the project root.
fn check_clean_targets(targets: &[Utf8PathBuf]) -> TaskResult<()> {
    let unsafe_target = targets.iter().find(|target| {
        target.as_str().is_empty()
            || target
                .components()
                .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
    });
    match unsafe_target {
        Some(target) => Err(TaskError::UnsafeTarget(target.clone())),
        None => Ok(()),
    }
}

/// Run `task` and its dependencies in `root`.
///
/// Shorthand for [`TaskRunner`] without progress reporting.
pub fn run_task(
    root: &Utf8Path,
    task: TaskName,
    settings: &TaskSettings,
    runner: &dyn ToolRunner,
    dry_run: bool,
) -> TaskResult<TaskOutcome> {
    TaskRunner::new(root, settings, runner)
        .dry_run(dry_run)
        .run(task, &mut |_| {})
}
