//! Both release-automation jobs for one trigger, as a CI run executes them.
//!
//! The jobs are independent: a failed release job does not stop the publish
//! job, and the other way around. The run fails if either job failed.

pub mod definition;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{error, instrument};

use crate::publish::{PublishJob, PublishOutcome, PublishPlan, PublishSettings};
use crate::release::{ReleaseJob, ReleaseOutcome, ReleasePlan, ReleaseSettings};
use crate::runner::ToolRunner;
use crate::step::StepEvent;
use crate::tasks::TaskSettings;
use crate::trigger::Trigger;

pub use definition::{WorkflowDefinition, WorkflowOptions};

/// How one job of a run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum JobOutcome<T> {
    /// The job completed (a skipped publish job also counts).
    Succeeded {
        /// The job's report.
        report: T,
    },
    /// The job stopped at a failing step.
    Failed {
        /// The error and its causes, joined with `": "`.
        error: String,
    },
}

impl<T> JobOutcome<T> {
    /// Whether the job completed.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    fn from_result<E: std::error::Error>(job: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(report) => Self::Succeeded { report },
            Err(e) => {
                let error = error_chain(&e);
                error!(%job, %error, "job failed");
                Self::Failed { error }
            }
        }
    }
}

/// Result of a workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    /// The trigger both jobs ran for.
    pub trigger: Trigger,
    /// Release job.
    pub release: JobOutcome<ReleaseOutcome>,
    /// Publish job.
    pub publish: JobOutcome<PublishOutcome>,
}

impl WorkflowOutcome {
    /// Whether both jobs completed.
    pub const fn is_success(&self) -> bool {
        self.release.is_success() && self.publish.is_success()
    }
}

/// Settings shared by both jobs.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowSettings<'a> {
    /// Task settings (for `restore-env` in the publish job).
    pub tasks: &'a TaskSettings,
    /// Release job settings.
    pub release: &'a ReleaseSettings,
    /// Publish job settings.
    pub publish: &'a PublishSettings,
}

/// Run the release job, then the publish job.
#[instrument(skip_all, fields(event = %trigger.event, git_ref = %trigger.git_ref, dry_run = dry_run))]
pub fn run_workflow(
    root: &Utf8Path,
    trigger: &Trigger,
    repository: Option<String>,
    settings: WorkflowSettings<'_>,
    runner: &dyn ToolRunner,
    dry_run: bool,
    on_event: &mut dyn FnMut(StepEvent),
) -> WorkflowOutcome {
    let release_plan = ReleasePlan::from_trigger(trigger, settings.release, repository);
    let release = JobOutcome::from_result(
        "release",
        ReleaseJob::new(root, runner)
            .dry_run(dry_run)
            .serialize_runs(settings.release.serialize_runs)
            .run(&release_plan, on_event),
    );

    let publish = JobOutcome::from_result(
        "publish",
        PublishJob::new(root, settings.publish, settings.tasks, runner)
            .dry_run(dry_run)
            .run(&PublishPlan::from_trigger(trigger), on_event),
    );

    WorkflowOutcome {
        trigger: trigger.clone(),
        release,
        publish,
    }
}

/// Render an error and its sources on one line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{RecordingRunner, failed, ok};
    use crate::trigger::{GitRef, TriggerEvent};
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn run(root: &Utf8Path, trigger: &Trigger, runner: &RecordingRunner) -> WorkflowOutcome {
        let tasks = TaskSettings::default();
        let release = ReleaseSettings::default();
        let publish = PublishSettings::default();
        run_workflow(
            root,
            trigger,
            Some("acme/widgets".into()),
            WorkflowSettings {
                tasks: &tasks,
                release: &release,
                publish: &publish,
            },
            runner,
            false,
            &mut |_| {},
        )
    }

    fn root() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    #[test]
    fn release_failure_does_not_skip_publish() {
        let (_tmp, root) = root();
        let runner = RecordingRunner::with_responder(|inv, _| {
            if inv.program == "gh" {
                failed(1, "release already exists")
            } else {
                ok("")
            }
        });
        let trigger = Trigger::validate(TriggerEvent::Push, GitRef::tag("v1.2.3")).unwrap();
        let outcome = run(&root, &trigger, &runner);

        assert!(!outcome.is_success());
        match outcome.release {
            JobOutcome::Failed { ref error } => {
                assert!(error.contains("create release"), "{error}");
                assert!(error.contains("release already exists"), "{error}");
            }
            JobOutcome::Succeeded { .. } => panic!("release should fail"),
        }
        assert!(outcome.publish.is_success());
        assert!(runner.commands().contains(&"uv build".to_string()));
    }

    #[test]
    fn nightly_run_skips_publish() {
        let (_tmp, root) = root();
        let runner = RecordingRunner::succeeding();
        let trigger =
            Trigger::validate(TriggerEvent::WorkflowDispatch, GitRef::branch("main")).unwrap();
        let outcome = run(&root, &trigger, &runner);

        assert!(outcome.is_success());
        assert!(matches!(
            outcome.publish,
            JobOutcome::Succeeded {
                report: PublishOutcome::Skipped { .. }
            }
        ));
        assert!(runner.commands().iter().all(|c| !c.starts_with("uv ")));
    }

    #[test]
    fn outcome_serializes_job_status() {
        let (_tmp, root) = root();
        let runner = RecordingRunner::succeeding();
        let trigger =
            Trigger::validate(TriggerEvent::WorkflowDispatch, GitRef::branch("main")).unwrap();
        let json = serde_json::to_value(run(&root, &trigger, &runner)).unwrap();
        assert_eq!(json["release"]["status"], "succeeded");
        assert_eq!(json["publish"]["report"]["status"], "skipped");
        assert_eq!(json["trigger"]["ref"], "refs/heads/main");
    }
}
