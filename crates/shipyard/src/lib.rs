//! Library interface for the `shipyard` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG              Log filter (e.g., debug, shipyard_core=trace)
    SHIPYARD_LOG_PATH     Explicit log file path
    SHIPYARD_LOG_DIR      Log directory
    SHIPYARD_<KEY>        Config override (e.g. SHIPYARD_TASKS__SYNC=frozen-no-dev)
    GITHUB_EVENT_NAME     Trigger event (push, workflow_dispatch)
    GITHUB_REF            Trigger ref (e.g. refs/tags/v1.2.3)
    GITHUB_REPOSITORY     Repository identifier for changelogs (owner/name)
";

/// Command-line interface definition for shipyard.
#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Developer tasks and tag-driven releases for uv-managed Python packages", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Sync the project environment unless it already exists
    RestoreEnv(commands::task::TaskArgs),

    /// Bump the version, run the checks and amend the bump commit
    #[command(alias = "v")]
    BumpVersion(commands::task::TaskArgs),

    /// Remove build artifacts and caches
    Clean(commands::task::TaskArgs),

    /// Run every pre-commit check against all files
    PrecommitRunAll(commands::task::TaskArgs),

    /// Generate the changelog and create the hosted release
    Release(commands::trigger::TriggerArgs),

    /// Build and upload the package (version tags only)
    Publish(commands::trigger::TriggerArgs),

    /// Run the release job, then the publish job, as CI does
    Workflow(commands::trigger::TriggerArgs),

    /// Write the CI workflow definition
    EmitWorkflow(commands::emit::EmitArgs),

    /// Diagnose configuration, environment and external tools
    Doctor(commands::doctor::DoctorArgs),

    /// Show package information and resolved settings
    Info(commands::info::InfoArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
