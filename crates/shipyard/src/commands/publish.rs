//! Publish command: build and upload, gated on a version tag.

use anyhow::Context;
use camino::Utf8Path;
use owo_colors::OwoColorize;
use tracing::instrument;

use shipyard_core::Config;
use shipyard_core::publish::{PublishJob, PublishOutcome, PublishPlan, PublishSettings};
use shipyard_core::tasks::TaskSettings;

use super::trigger::TriggerArgs;
use super::{StepPrinter, print_json, summary_line, system_runner};

/// Print how a publish job ended.
pub fn print_outcome(outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::Published { steps, dry_run, tag } => {
            println!("{}", summary_line("publish", steps, *dry_run).bold());
            if !dry_run {
                println!("{} {}", "Published:".dimmed(), tag.cyan());
            }
        }
        PublishOutcome::Skipped { reason } => {
            println!("{} {}", "publish: skipped,".yellow(), reason);
        }
    }
}

/// Run the publish job.
#[instrument(name = "cmd_publish", skip_all, fields(dry_run = args.dry_run))]
pub fn cmd_publish(
    args: TriggerArgs,
    global_json: bool,
    config: &Config,
    root: &Utf8Path,
) -> anyhow::Result<()> {
    let trigger = args.resolve(root)?;
    let settings = PublishSettings::from_config(config);
    let tasks = TaskSettings::from_config(config);

    let runner = system_runner(global_json);
    let mut printer = StepPrinter::new(global_json);
    let outcome = PublishJob::new(root, &settings, &tasks, &runner)
        .dry_run(args.dry_run)
        .run(&PublishPlan::from_trigger(&trigger), &mut |event| {
            printer.handle(event)
        })
        .context("publish job failed")?;
    drop(printer);

    if global_json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}
