//! Ordered steps shared by tasks and release jobs.
//!
//! A task or job is a list of [`Step`]s executed strictly in order. The first
//! failing step stops the sequence unless it is marked `allow_failure`.
//! Nothing already done is rolled back.

use camino::Utf8Path;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::runner::{RunError, ToolInvocation, ToolOutput, ToolRunner};

/// A step failed and stopped its sequence.
#[derive(Error, Debug)]
#[error("step `{step}` failed")]
pub struct StepError {
    /// Name of the failing step.
    pub step: String,
    /// What went wrong running the tool.
    #[source]
    pub source: RunError,
}

/// One tool invocation inside a task or job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Short human-readable name (e.g. `"changelog"`).
    pub name: String,
    /// The tool call.
    pub invocation: ToolInvocation,
    /// Keep going when the tool exits non-zero.
    pub allow_failure: bool,
}

impl Step {
    /// A step whose failure stops the sequence.
    pub fn new(name: impl Into<String>, invocation: ToolInvocation) -> Self {
        Self {
            name: name.into(),
            invocation,
            allow_failure: false,
        }
    }

    /// A step whose non-zero exit is recorded and ignored.
    pub fn tolerant(name: impl Into<String>, invocation: ToolInvocation) -> Self {
        Self {
            allow_failure: true,
            ..Self::new(name, invocation)
        }
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepOutcome {
    /// The step ran (or, in a dry run, would run).
    Success {
        /// Description of what happened.
        message: String,
    },
    /// The step exited non-zero but was allowed to.
    Tolerated {
        /// Exit code, when the process exited normally.
        code: Option<i32>,
    },
    /// The step did not need to run.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// Record of one step, for reports and `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Task or job the step belongs to (e.g. `"restore-env"`, `"release"`).
    pub scope: String,
    /// Step name.
    pub name: String,
    /// Rendered command line.
    pub command: String,
    /// How it ended.
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Progress notifications emitted while steps run.
#[derive(Debug, Clone)]
pub enum StepEvent {
    /// A step is about to run.
    Started {
        /// Task or job name.
        scope: String,
        /// Step name.
        step: String,
        /// Rendered command line.
        command: String,
    },
    /// A step has finished (or was skipped).
    Completed(StepReport),
}

/// Report a step that was decided without running anything.
pub fn skip_step(
    scope: &str,
    name: &str,
    command: String,
    reason: String,
    on_event: &mut dyn FnMut(StepEvent),
) -> StepReport {
    let report = StepReport {
        scope: scope.to_string(),
        name: name.to_string(),
        command,
        outcome: StepOutcome::Skipped { reason },
    };
    on_event(StepEvent::Completed(report.clone()));
    report
}

/// Run one step, returning its report and the tool output.
///
/// In a dry run nothing is spawned and the output is empty.
pub fn run_step(
    step: &Step,
    scope: &str,
    runner: &dyn ToolRunner,
    cwd: &Utf8Path,
    dry_run: bool,
    on_event: &mut dyn FnMut(StepEvent),
) -> Result<(StepReport, ToolOutput), StepError> {
    let command = step.invocation.to_string();
    on_event(StepEvent::Started {
        scope: scope.to_string(),
        step: step.name.clone(),
        command: command.clone(),
    });

    let (outcome, output) = if dry_run {
        (
            StepOutcome::Success {
                message: format!("would run: {command}"),
            },
            ToolOutput::default(),
        )
    } else {
        debug!(%scope, step = %step.name, %command, "running step");
        let output = runner
            .run(&step.invocation, cwd)
            .map_err(|source| StepError {
                step: step.name.clone(),
                source,
            })?;

        if output.success {
            (
                StepOutcome::Success {
                    message: format!("ran: {command}"),
                },
                output,
            )
        } else if step.allow_failure {
            warn!(%scope, step = %step.name, code = ?output.code, "step failed, continuing");
            (StepOutcome::Tolerated { code: output.code }, output)
        } else {
            return Err(StepError {
                step: step.name.clone(),
                source: RunError::Failed {
                    command,
                    code: output.code,
                    stderr: output.stderr.trim().to_string(),
                },
            });
        }
    };

    let report = StepReport {
        scope: scope.to_string(),
        name: step.name.clone(),
        command,
        outcome,
    };
    on_event(StepEvent::Completed(report.clone()));
    Ok((report, output))
}

/// Run steps in order, stopping at the first non-tolerated failure.
pub fn run_steps(
    steps: &[Step],
    scope: &str,
    runner: &dyn ToolRunner,
    cwd: &Utf8Path,
    dry_run: bool,
    on_event: &mut dyn FnMut(StepEvent),
) -> Result<Vec<StepReport>, StepError> {
    steps
        .iter()
        .map(|step| run_step(step, scope, runner, cwd, dry_run, on_event).map(|(report, _)| report))
        .collect()
}
