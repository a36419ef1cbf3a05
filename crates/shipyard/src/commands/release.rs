//! Release command: changelog plus hosted release for the resolved trigger.

use anyhow::Context;
use camino::Utf8Path;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipyard_core::Config;
use shipyard_core::git;
use shipyard_core::release::{ReleaseJob, ReleasePlan, ReleaseSettings, resolve_repository};
use shipyard_core::trigger::Trigger;

use super::trigger::TriggerArgs;
use super::{StepPrinter, env_var, print_json, summary_line, system_runner};

/// Repository identifier from config, CI, or the `origin` remote.
pub fn repository_for(settings: &ReleaseSettings, root: &Utf8Path) -> Option<String> {
    resolve_repository(settings, env_var, || {
        git::remote_url(root, "origin").ok().flatten()
    })
}

/// Print the decisions the release job made for a trigger.
pub fn print_plan(trigger: &Trigger, plan: &ReleasePlan) {
    println!(
        "{} {} on {}",
        "Trigger:".dimmed(),
        trigger.event.cyan(),
        trigger.git_ref.cyan()
    );
    println!(
        "{} {} ({}, prerelease={}, latest={})",
        "Release:".dimmed(),
        plan.tag_name.bold(),
        plan.range.flag(),
        plan.prerelease,
        plan.make_latest
    );
    if let Some(ref repo) = plan.repository {
        println!("{} {}", "Repository:".dimmed(), repo);
    }
}

/// Run the release job.
#[instrument(name = "cmd_release", skip_all, fields(dry_run = args.dry_run))]
pub fn cmd_release(
    args: TriggerArgs,
    global_json: bool,
    config: &Config,
    root: &Utf8Path,
) -> anyhow::Result<()> {
    let trigger = args.resolve(root)?;
    let settings = ReleaseSettings::from_config(config);
    let plan = ReleasePlan::from_trigger(&trigger, &settings, repository_for(&settings, root));
    debug!(?plan, "release plan");

    if !global_json {
        print_plan(&trigger, &plan);
    }

    let runner = system_runner(global_json);
    let mut printer = StepPrinter::new(global_json);
    let outcome = ReleaseJob::new(root, &runner)
        .dry_run(args.dry_run)
        .serialize_runs(settings.serialize_runs)
        .run(&plan, &mut |event| printer.handle(event))
        .context("release job failed")?;
    drop(printer);

    if global_json {
        print_json(&outcome)?;
    } else {
        println!(
            "{}",
            summary_line("release", &outcome.steps, outcome.dry_run).bold()
        );
        if let Some(ref url) = outcome.url {
            println!("{} {}", "URL:".dimmed(), url.cyan());
        }
    }
    Ok(())
}
