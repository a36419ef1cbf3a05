//! Info command: show package, config, and resolved task and job settings.

use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use shipyard_core::Config;
use shipyard_core::config::ConfigSource;
use shipyard_core::publish::PublishSettings;
use shipyard_core::release::ReleaseSettings;
use shipyard_core::tasks::{TaskName, TaskSettings};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    sources: Vec<ConfigSource>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
}

#[derive(Serialize)]
struct SettingsInfo {
    root: String,
    tasks: TaskSettings,
    release: ReleaseSettings,
    publish: PublishSettings,
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    settings: SettingsInfo,
}

impl FullInfo {
    fn gather(config: &Config, root: &Utf8Path, sources: &[ConfigSource]) -> Self {
        Self {
            package: PackageInfo::new(),
            config: ConfigInfo {
                sources: sources.to_vec(),
                log_level: config.log_level.as_str().to_string(),
                log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            },
            settings: SettingsInfo {
                root: root.to_string(),
                tasks: TaskSettings::from_config(config),
                release: ReleaseSettings::from_config(config),
                publish: PublishSettings::from_config(config),
            },
        }
    }
}

/// Print package information and the settings commands will run with.
#[instrument(name = "cmd_info", skip_all, fields(json_output = global_json))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    root: &Utf8Path,
    sources: &[ConfigSource],
) -> anyhow::Result<()> {
    debug!("executing info command");
    let info = FullInfo::gather(config, root, sources);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!(
        "{} {}",
        info.package.name.bold(),
        info.package.version.green()
    );
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!(
            "{}: {}",
            "Repository".dimmed(),
            info.package.repository.cyan()
        );
    }

    println!();
    println!("{}", "Configuration".bold().underline());
    if info.config.sources.is_empty() {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    for source in &info.config.sources {
        println!("{}: {}", "Config file".dimmed(), source.path.cyan());
    }
    println!("{}: {}", "Log level".dimmed(), info.config.log_level);
    if let Some(ref dir) = info.config.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }

    let settings = &info.settings;
    println!();
    println!("{}", "Tasks".bold().underline());
    println!("{}: {}", "Project root".dimmed(), settings.root.cyan());
    println!(
        "{}: {} ({})",
        "Environment".dimmed(),
        settings.tasks.env_dir,
        settings.tasks.sync.as_str()
    );
    for task in TaskName::ALL {
        let deps = task.dependencies(&settings.tasks);
        let deps = if deps.is_empty() {
            "no dependencies".to_string()
        } else {
            let names: Vec<_> = deps.iter().map(|d| d.as_str()).collect();
            format!("after {}", names.join(", "))
        };
        println!("  {} {}", task.as_str().cyan(), deps.dimmed());
    }
    let clean_tool = settings
        .tasks
        .clean_tool
        .as_ref()
        .filter(|argv| !argv.is_empty())
        .map_or_else(|| "disabled".to_string(), |argv| argv.join(" "));
    println!("{}: {}", "Cleanup tool".dimmed(), clean_tool);

    println!();
    println!("{}", "Release".bold().underline());
    println!(
        "{}: {}",
        "Repository".dimmed(),
        settings
            .release
            .repository
            .as_deref()
            .unwrap_or("(from GITHUB_REPOSITORY or origin)")
    );
    println!("{}: {}", "Nightly tag".dimmed(), settings.release.nightly_tag);
    println!(
        "{}: {}",
        "Serialize runs".dimmed(),
        settings.release.serialize_runs
    );
    println!(
        "{}: {}",
        "Trusted publishing".dimmed(),
        settings.publish.trusted_publishing.as_str()
    );

    Ok(())
}
