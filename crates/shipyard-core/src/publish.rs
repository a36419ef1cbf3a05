//! The publish job: build and upload with trusted publishing.
//!
//! Gated on the trigger: anything other than a `v*` tag skips the whole job
//! without running a tool. No credential is read or passed; the index
//! authenticates the CI identity token.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::Config;
use crate::runner::{ToolInvocation, ToolRunner};
use crate::step::{Step, StepError, StepEvent, StepReport, run_step};
use crate::tasks::{TaskError, TaskName, TaskRunner, TaskSettings};
use crate::trigger::Trigger;

/// Errors from the publish job.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Restoring the environment failed.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A tool step failed.
    #[error(transparent)]
    Step(#[from] StepError),
}

/// Result alias for the publish job.
pub type PublishResult<T> = Result<T, PublishError>;

/// `uv publish --trusted-publishing` mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TrustedPublishing {
    /// Require the identity token; fail without it.
    #[default]
    Always,
    /// Use the identity token when the CI provides one.
    Automatic,
    /// Never use trusted publishing.
    Never,
}

impl TrustedPublishing {
    /// Value passed to `--trusted-publishing`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Automatic => "automatic",
            Self::Never => "never",
        }
    }
}

/// Publish settings with config overrides applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishSettings {
    /// Interpreter request for `uv python install` (e.g. `"3.12"`).
    pub python: Option<String>,
    /// Trusted publishing mode.
    pub trusted_publishing: TrustedPublishing,
    /// Upload endpoint, when not the default index.
    pub publish_url: Option<String>,
}

impl PublishSettings {
    /// Resolve settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let Some(ref publish) = config.publish else {
            return Self::default();
        };
        Self {
            python: publish.python.clone(),
            trusted_publishing: publish.trusted_publishing.unwrap_or_default(),
            publish_url: publish.publish_url.clone(),
        }
    }

    /// `uv python install [<python>]`.
    pub fn python_install_invocation(&self) -> ToolInvocation {
        let inv = ToolInvocation::new("uv").args(["python", "install"]);
        match self.python {
            Some(ref python) => inv.arg(python.as_str()),
            None => inv,
        }
    }

    /// `uv build`.
    pub fn build_invocation() -> ToolInvocation {
        ToolInvocation::new("uv").arg("build")
    }

    /// `uv publish --trusted-publishing <mode> [--publish-url <url>]`.
    pub fn publish_invocation(&self) -> ToolInvocation {
        let inv = ToolInvocation::new("uv").args([
            "publish",
            "--trusted-publishing",
            self.trusted_publishing.as_str(),
        ]);
        match self.publish_url {
            Some(ref url) => inv.args(["--publish-url", url.as_str()]),
            None => inv,
        }
    }
}

/// Whether the publish job runs for a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum PublishPlan {
    /// The trigger is a version tag; publish it.
    Run {
        /// Tag being published.
        tag: String,
    },
    /// The trigger is not a version tag; nothing runs.
    Skipped {
        /// Why the job is skipped.
        reason: String,
    },
}

impl PublishPlan {
    /// Gate the job on the trigger's tag shape.
    pub fn from_trigger(trigger: &Trigger) -> Self {
        match trigger.git_ref.tag_name() {
            Some(tag) if trigger.is_version_tag() => Self::Run {
                tag: tag.to_string(),
            },
            _ => Self::Skipped {
                reason: format!("`{}` is not a version tag", trigger.git_ref),
            },
        }
    }
}

/// Result of a publish job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PublishOutcome {
    /// Artifacts were built and uploaded (or would be, in a dry run).
    Published {
        /// Tag that was published.
        tag: String,
        /// Whether this was a dry run.
        dry_run: bool,
        /// Steps, in order, including `restore-env`.
        steps: Vec<StepReport>,
    },
    /// The job did not run.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// Runs the publish job for a project root.
pub struct PublishJob<'a> {
    root: &'a Utf8Path,
    settings: &'a PublishSettings,
    tasks: &'a TaskSettings,
    runner: &'a dyn ToolRunner,
    dry_run: bool,
}

impl<'a> PublishJob<'a> {
    /// Create a publish job. `tasks` configures the `restore-env` step.
    pub const fn new(
        root: &'a Utf8Path,
        settings: &'a PublishSettings,
        tasks: &'a TaskSettings,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            root,
            settings,
            tasks,
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

    /// Run the job.
    #[instrument(skip_all, fields(dry_run = self.dry_run))]
    pub fn run(
        &self,
        plan: &PublishPlan,
        on_event: &mut dyn FnMut(StepEvent),
    ) -> PublishResult<PublishOutcome> {
        let tag = match plan {
            PublishPlan::Run { tag } => tag.clone(),
            PublishPlan::Skipped { reason } => {
                info!(%reason, "publish job skipped");
                return Ok(PublishOutcome::Skipped {
                    reason: reason.clone(),
                });
            }
        };

        let scope = "publish";
        let mut steps = Vec::new();

        let (report, _) = run_step(
            &Step::new("install python", self.settings.python_install_invocation()),
            scope,
            self.runner,
            self.root,
            self.dry_run,
            on_event,
        )?;
        steps.push(report);

        let restored = TaskRunner::new(self.root, self.tasks, self.runner)
            .dry_run(self.dry_run)
            .run(TaskName::RestoreEnv, on_event)?;
        steps.extend(restored.steps);

        for step in [
            Step::new("build", PublishSettings::build_invocation()),
            Step::new("upload", self.settings.publish_invocation()),
        ] {
            let (report, _) = run_step(
                &step,
                scope,
                self.runner,
                self.root,
                self.dry_run,
                on_event,
            )?;
            steps.push(report);
        }

        info!(%tag, "publish job finished");
        Ok(PublishOutcome::Published {
            tag,
            dry_run: self.dry_run,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{RecordingRunner, failed, ok};
    use crate::trigger::{GitRef, TriggerEvent};
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn root() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    fn run_job(
        root: &Utf8Path,
        trigger: &Trigger,
        runner: &RecordingRunner,
    ) -> PublishResult<PublishOutcome> {
        let settings = PublishSettings::default();
        let tasks = TaskSettings::default();
        PublishJob::new(root, &settings, &tasks, runner)
            .run(&PublishPlan::from_trigger(trigger), &mut |_| {})
    }

    #[test]
    fn non_version_ref_skips_without_invocations() {
        let (_tmp, root) = root();
        let runner = RecordingRunner::succeeding();
        for trigger in [
            Trigger::validate(TriggerEvent::WorkflowDispatch, GitRef::branch("main")).unwrap(),
            Trigger::validate(TriggerEvent::WorkflowDispatch, GitRef::tag("docs-2024")).unwrap(),
        ] {
            let outcome = run_job(&root, &trigger, &runner).unwrap();
            assert!(matches!(outcome, PublishOutcome::Skipped { .. }));
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn version_tag_publishes_in_order() {
        let (_tmp, root) = root();
        let runner = RecordingRunner::succeeding();
        let trigger = Trigger::validate(TriggerEvent::Push, GitRef::tag("v1.2.3")).unwrap();
        let outcome = run_job(&root, &trigger, &runner).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "uv python install",
                "uv sync --all-groups",
                "uv build",
                "uv publish --trusted-publishing always",
            ]
        );
        match outcome {
            PublishOutcome::Published { tag, steps, .. } => {
                assert_eq!(tag, "v1.2.3");
                assert_eq!(steps[1].scope, "restore-env");
            }
            PublishOutcome::Skipped { .. } => panic!("expected publish"),
        }
    }

    #[test]
    fn build_failure_aborts_upload() {
        let (_tmp, root) = root();
        let runner = RecordingRunner::with_responder(|inv, _| {
            if inv.args.first().map(String::as_str) == Some("build") {
                failed(2, "missing build backend")
            } else {
                ok("")
            }
        });
        let trigger = Trigger::validate(TriggerEvent::Push, GitRef::tag("v1.2.3")).unwrap();
        let err = run_job(&root, &trigger, &runner).unwrap_err();
        assert!(matches!(err, PublishError::Step(ref e) if e.step == "build"));
        assert!(runner.commands().iter().all(|c| !c.starts_with("uv publish")));
    }

    #[test]
    fn configured_python_and_url() {
        let settings = PublishSettings {
            python: Some("3.12".into()),
            trusted_publishing: TrustedPublishing::Automatic,
            publish_url: Some("https://test.pypi.org/legacy/".into()),
        };
        assert_eq!(
            settings.python_install_invocation().to_string(),
            "uv python install 3.12"
        );
        assert_eq!(
            settings.publish_invocation().to_string(),
            "uv publish --trusted-publishing automatic --publish-url https://test.pypi.org/legacy/"
        );
    }

    #[test]
    fn plan_serializes_decision() {
        let trigger = Trigger::validate(TriggerEvent::Push, GitRef::tag("v3.0.0")).unwrap();
        let json = serde_json::to_string(&PublishPlan::from_trigger(&trigger)).unwrap();
        assert_eq!(json, r#"{"decision":"run","tag":"v3.0.0"}"#);
    }
}
