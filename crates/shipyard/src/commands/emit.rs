//! Emit-workflow command: write the CI definition for tag-driven releases.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use shipyard_core::workflow::definition::{
    DEFAULT_WORKFLOW_PATH, WorkflowDefinition, WorkflowOptions, decorate,
};

use super::print_json;

/// Arguments for the `emit-workflow` subcommand.
#[derive(Args, Debug, Default)]
pub struct EmitArgs {
    /// Print the workflow instead of writing it
    #[arg(long)]
    pub stdout: bool,

    /// Overwrite an existing workflow file
    #[arg(long)]
    pub force: bool,

    /// Output path, relative to the project root
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,
}

#[derive(Serialize)]
struct EmitReport {
    path: Utf8PathBuf,
    overwritten: bool,
}

/// Render the workflow as YAML with its header and concurrency comments.
pub fn render_workflow(options: &WorkflowOptions) -> anyhow::Result<String> {
    let definition = WorkflowDefinition::new(options);
    let yaml = serde_saphyr::to_string(&definition).context("failed to render workflow YAML")?;
    Ok(decorate(&yaml))
}

/// Write (or print) the CI workflow definition.
#[instrument(name = "cmd_emit_workflow", skip_all, fields(stdout = args.stdout, force = args.force))]
pub fn cmd_emit_workflow(
    args: EmitArgs,
    global_json: bool,
    root: &Utf8Path,
) -> anyhow::Result<()> {
    let rendered = render_workflow(&WorkflowOptions::default())?;

    if args.stdout {
        print!("{rendered}");
        return Ok(());
    }

    let relative = args
        .output
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORKFLOW_PATH));
    let path = root.join(relative);
    let exists = path.exists();
    if exists && !args.force {
        anyhow::bail!("{path} already exists; pass --force to overwrite it");
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {parent}"))?;
    }
    std::fs::write(&path, &rendered).with_context(|| format!("failed to write {path}"))?;
    debug!(%path, overwritten = exists, "workflow written");

    if global_json {
        print_json(&EmitReport {
            path,
            overwritten: exists,
        })?;
    } else {
        let verb = if exists { "Overwrote" } else { "Wrote" };
        println!("{} {} {}", "✓".green(), verb, path.cyan());
    }
    Ok(())
}
