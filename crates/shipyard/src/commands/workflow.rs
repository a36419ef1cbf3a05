//! Workflow command: both jobs for one trigger, like a CI run.

use camino::Utf8Path;
use owo_colors::OwoColorize;
use tracing::instrument;

use shipyard_core::Config;
use shipyard_core::publish::PublishSettings;
use shipyard_core::release::{ReleasePlan, ReleaseSettings};
use shipyard_core::tasks::TaskSettings;
use shipyard_core::workflow::{JobOutcome, WorkflowSettings, run_workflow};

use super::release::{print_plan, repository_for};
use super::trigger::TriggerArgs;
use super::{StepPrinter, print_json, summary_line, system_runner};

/// Run the release job, then the publish job.
///
/// Fails when either job failed; the other job still runs.
#[instrument(name = "cmd_workflow", skip_all, fields(dry_run = args.dry_run))]
pub fn cmd_workflow(
    args: TriggerArgs,
    global_json: bool,
    config: &Config,
    root: &Utf8Path,
) -> anyhow::Result<()> {
    let trigger = args.resolve(root)?;
    let tasks = TaskSettings::from_config(config);
    let release = ReleaseSettings::from_config(config);
    let publish = PublishSettings::from_config(config);
    let repository = repository_for(&release, root);

    if !global_json {
        print_plan(
            &trigger,
            &ReleasePlan::from_trigger(&trigger, &release, repository.clone()),
        );
    }

    let runner = system_runner(global_json);
    let mut printer = StepPrinter::new(global_json);
    let outcome = run_workflow(
        root,
        &trigger,
        repository,
        WorkflowSettings {
            tasks: &tasks,
            release: &release,
            publish: &publish,
        },
        &runner,
        args.dry_run,
        &mut |event| printer.handle(event),
    );
    drop(printer);

    if global_json {
        print_json(&outcome)?;
    } else {
        match outcome.release {
            JobOutcome::Succeeded { ref report } => println!(
                "{}",
                summary_line("release", &report.steps, report.dry_run).bold()
            ),
            JobOutcome::Failed { ref error } => {
                println!("{} {}", "release: failed:".red().bold(), error);
            }
        }
        match outcome.publish {
            JobOutcome::Succeeded { ref report } => super::publish::print_outcome(report),
            JobOutcome::Failed { ref error } => {
                println!("{} {}", "publish: failed:".red().bold(), error);
            }
        }
    }

    let failed: Vec<&str> = [
        (!outcome.release.is_success()).then_some("release"),
        (!outcome.publish.is_success()).then_some("publish"),
    ]
    .into_iter()
    .flatten()
    .collect();
    match failed.as_slice() {
        [] => Ok(()),
        [job] => anyhow::bail!("workflow failed: {job} job failed"),
        jobs => anyhow::bail!("workflow failed: {} jobs failed", jobs.join(" and ")),
    }
}
