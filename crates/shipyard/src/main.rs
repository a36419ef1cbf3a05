//! shipyard CLI
#![deny(unsafe_code)]

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use shipyard::commands::task::TaskArgs;
use shipyard::{Cli, Commands, commands};
use shipyard_core::config::{self, ConfigLoader};
use shipyard_core::tasks::TaskName;
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let root = config::project_root(&cwd);

    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        let config_path = Utf8PathBuf::try_from(config_path.clone()).map_err(|e| {
            anyhow::anyhow!(
                "config path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        loader = loader.with_file(&config_path);
    }
    let sources = loader.sources();
    let config = loader.load().context("failed to load configuration")?;

    let obs_config = observability::ObservabilityConfig::from_env_with_overrides(config.log_dir.clone());
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter)
        .context("failed to initialize logging")?;

    let json = cli.json;
    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json,
        color = ?cli.color,
        %cwd,
        %root,
        "CLI initialized"
    );

    let run_task = |task: TaskName, args: TaskArgs| {
        commands::task::cmd_task(task, args, json, &config, &root)
    };
    let result = match cli.command {
        Commands::RestoreEnv(args) => run_task(TaskName::RestoreEnv, args),
        Commands::BumpVersion(args) => run_task(TaskName::BumpVersion, args),
        Commands::Clean(args) => run_task(TaskName::Clean, args),
        Commands::PrecommitRunAll(args) => run_task(TaskName::PrecommitRunAll, args),
        Commands::Release(args) => commands::release::cmd_release(args, json, &config, &root),
        Commands::Publish(args) => commands::publish::cmd_publish(args, json, &config, &root),
        Commands::Workflow(args) => {
            commands::workflow::cmd_workflow(args, json, &config, &root)
        }
        Commands::EmitWorkflow(args) => commands::emit::cmd_emit_workflow(args, json, &root),
        Commands::Doctor(args) => {
            commands::doctor::cmd_doctor(args, json, &cwd, &root, &sources)
        }
        Commands::Info(args) => commands::info::cmd_info(args, json, &config, &root, &sources),
    };
    if let Err(ref err) = result {
        tracing::error!(error = %format!("{err:#}"), "fatal error");
    }
    result
}
