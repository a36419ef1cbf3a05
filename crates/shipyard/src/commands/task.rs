//! Task commands: `restore-env`, `bump-version`, `clean`, `precommit-run-all`.

use anyhow::Context;
use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipyard_core::Config;
use shipyard_core::tasks::{SyncMode, TaskName, TaskRunner, TaskSettings};

use super::{StepPrinter, print_json, summary_line, system_runner};

/// Arguments shared by the task subcommands.
#[derive(Args, Debug, Default)]
pub struct TaskArgs {
    /// Print the resolved steps without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// How `restore-env` installs dependencies (overrides `tasks.sync`)
    #[arg(long, value_enum, value_name = "MODE")]
    pub sync: Option<SyncMode>,
}

/// Run a task and its dependencies in the project root.
#[instrument(name = "cmd_task", skip_all, fields(%task, dry_run = args.dry_run))]
pub fn cmd_task(
    task: TaskName,
    args: TaskArgs,
    global_json: bool,
    config: &Config,
    root: &Utf8Path,
) -> anyhow::Result<()> {
    let mut settings = TaskSettings::from_config(config);
    if let Some(sync) = args.sync {
        settings.sync = sync;
    }
    debug!(?settings, "task settings");

    let runner = system_runner(global_json);
    let mut printer = StepPrinter::new(global_json);
    let outcome = TaskRunner::new(root, &settings, &runner)
        .dry_run(args.dry_run)
        .run(task, &mut |event| printer.handle(event))
        .with_context(|| format!("{task} failed"))?;
    drop(printer);

    if global_json {
        print_json(&outcome)?;
    } else {
        println!(
            "{}",
            summary_line(task.as_str(), &outcome.steps, outcome.dry_run).bold()
        );
    }
    Ok(())
}
