//! Doctor command: diagnose configuration, environment and external tools.

use camino::Utf8Path;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use shipyard_core::config::{self, ConfigSource};
use shipyard_core::detect::{self, ProjectFiles, ToolReport, ToolVersionCheck};

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    project: ProjectStatus,
    tools: Vec<ToolReport>,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Files merged into the configuration, lowest precedence first
    sources: Vec<ConfigSource>,
    /// Whether any config file was found
    found: bool,
}

#[derive(Serialize)]
struct ProjectStatus {
    root: String,
    files: ProjectFiles,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: String,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const ENV_VARS: &[(&str, &str)] = &[
    ("GITHUB_EVENT_NAME", "Trigger event"),
    ("GITHUB_REF", "Trigger ref"),
    ("GITHUB_REPOSITORY", "Repository identifier"),
    ("SHIPYARD_LOG_PATH", "Explicit log file path"),
    ("SHIPYARD_LOG_DIR", "Log directory"),
    ("XDG_CONFIG_HOME", "Override config directory"),
    ("RUST_LOG", "Log filter directive"),
];

impl DoctorReport {
    fn gather(cwd: &Utf8Path, root: &Utf8Path, sources: &[ConfigSource]) -> Self {
        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: !sources.is_empty(),
                sources: sources.to_vec(),
            },
            project: ProjectStatus {
                root: root.to_string(),
                files: detect::detect_project_files(root),
            },
            tools: detect::probe_tools(),
            environment: EnvironmentInfo {
                cwd: cwd.to_string(),
                env_vars: ENV_VARS
                    .iter()
                    .map(|&(name, description)| EnvVar {
                        name,
                        value: std::env::var(name).ok(),
                        description,
                    })
                    .collect(),
            },
        }
    }

    fn tools_ok(&self) -> bool {
        self.tools.iter().all(|t| t.check.is_ok())
    }
}

/// Run diagnostics and report configuration status.
///
/// Missing or outdated tools are reported, not treated as errors.
#[instrument(name = "cmd_doctor", skip_all, fields(json_output = global_json))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    cwd: &Utf8Path,
    root: &Utf8Path,
    sources: &[ConfigSource],
) -> anyhow::Result<()> {
    debug!("executing doctor command");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Probing tools...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(cwd, root, sources);
    spinner.finish_and_clear();
    debug!(tools_ok = report.tools_ok(), "diagnostics gathered");

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        for source in &report.config.sources {
            println!(
                "  {} {:?} config: {}",
                "✓".green(),
                source.kind,
                source.path.cyan()
            );
        }
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    println!();

    println!("{}", "Tools".bold().underline());
    for tool in &report.tools {
        print_tool(tool);
    }
    println!();

    println!("{}", "Project".bold().underline());
    println!("  {}: {}", "Root".dimmed(), report.project.root.cyan());
    let files = &report.project.files;
    print_flag("pyproject.toml", files.pyproject);
    print_flag("uv.lock", files.uv_lock);
    print_flag(".pre-commit-config.yaml", files.pre_commit_config);
    print_flag("git-cliff config", files.cliff_config);
    print_flag("commitizen config", files.commitizen_config);
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Cache", report.directories.cache.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());
    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();
    if set_vars.is_empty() {
        println!("  {} No CI/logging overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {} {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan(),
                format!("({})", var.description).dimmed()
            );
        }
    }

    Ok(())
}

fn print_tool(tool: &ToolReport) {
    let label = format!("{:<10}", tool.binary);
    match tool.check {
        ToolVersionCheck::Ok { ref version } => {
            println!("  {} {} {}", "✓".green(), label, version.cyan());
        }
        ToolVersionCheck::TooOld {
            ref found,
            ref minimum,
        } => println!(
            "  {} {} {} {}",
            "✗".red(),
            label,
            found.red(),
            format!("(need >= {minimum})").dimmed()
        ),
        ToolVersionCheck::Missing => println!(
            "  {} {} {} {}",
            "✗".red(),
            label,
            "not found".red(),
            format!("({})", tool.purpose).dimmed()
        ),
        ToolVersionCheck::Unknown { ref reason } => {
            println!("  {} {} {}", "?".yellow(), label, reason.yellow());
        }
    }
}

fn print_flag(label: &str, present: bool) {
    if present {
        println!("  {} {}", "✓".green(), label);
    } else {
        println!("  {} {}", "○".dimmed(), label.dimmed());
    }
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");

    // Don't prompt if running non-interactively
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    // Declined or interrupted: nothing to do.
    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&shipyard_core::Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn test_cwd() -> Utf8PathBuf {
        Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn test_cmd_doctor_json_succeeds() {
        assert!(cmd_doctor(DoctorArgs::default(), true, &test_cwd(), &test_cwd(), &[]).is_ok());
    }

    #[test]
    fn test_doctor_report_gathers() {
        let report = DoctorReport::gather(&test_cwd(), &test_cwd(), &[]);
        assert!(!report.config.found);
        assert_eq!(report.tools.len(), detect::EXTERNAL_TOOLS.len());
        assert!(
            report
                .environment
                .env_vars
                .iter()
                .any(|v| v.name == "GITHUB_REF")
        );
    }
}
