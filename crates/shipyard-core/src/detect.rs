//! External tool and project detection.
//!
//! Probes `PATH` for the tools shipyard drives and reads their versions, and
//! looks at the project root for the files the tasks rely on.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, instrument};

/// An external tool shipyard invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    /// Binary name on `PATH`.
    pub binary: &'static str,
    /// What shipyard uses it for.
    pub purpose: &'static str,
    /// Oldest version with every flag shipyard passes.
    pub minimum: Option<semver::Version>,
}

/// The tools every command may reach for.
///
/// uv 0.5 has `sync --all-groups` and `publish --trusted-publishing`; gh 2.21
/// has `release create --latest`.
pub const EXTERNAL_TOOLS: &[ExternalTool] = &[
    ExternalTool {
        binary: "uv",
        purpose: "environments, build, publish",
        minimum: Some(semver::Version::new(0, 5, 0)),
    },
    ExternalTool {
        binary: "git",
        purpose: "history, amend, trigger detection",
        minimum: None,
    },
    ExternalTool {
        binary: "git-cliff",
        purpose: "changelog",
        minimum: Some(semver::Version::new(2, 0, 0)),
    },
    ExternalTool {
        binary: "gh",
        purpose: "hosted releases",
        minimum: Some(semver::Version::new(2, 21, 0)),
    },
];

/// Result of a tool version check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ToolVersionCheck {
    /// Tool found and new enough.
    Ok {
        /// Installed version.
        version: semver::Version,
    },
    /// Tool is too old.
    TooOld {
        /// The version that was found.
        found: semver::Version,
        /// The minimum required version.
        minimum: semver::Version,
    },
    /// Not on `PATH`.
    Missing,
    /// On `PATH`, but the version could not be determined.
    Unknown {
        /// What went wrong.
        reason: String,
    },
}

impl ToolVersionCheck {
    /// Whether the tool is usable.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// One probed tool, for doctor output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    /// Binary name.
    pub binary: &'static str,
    /// What shipyard uses it for.
    pub purpose: &'static str,
    /// Resolved path, when on `PATH`.
    pub path: Option<Utf8PathBuf>,
    /// Version status.
    pub check: ToolVersionCheck,
}

/// Check whether a binary is available on `PATH`.
pub fn has_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Probe every tool in [`EXTERNAL_TOOLS`].
#[instrument]
pub fn probe_tools() -> Vec<ToolReport> {
    EXTERNAL_TOOLS
        .iter()
        .map(|tool| {
            let path = which::which(tool.binary)
                .ok()
                .and_then(|p| Utf8PathBuf::from_path_buf(p).ok());
            let check = if path.is_some() {
                check_tool_version(tool.binary, tool.minimum.as_ref())
            } else {
                ToolVersionCheck::Missing
            };
            debug!(binary = tool.binary, ?check, "probed tool");
            ToolReport {
                binary: tool.binary,
                purpose: tool.purpose,
                path,
                check,
            }
        })
        .collect()
}

/// Run `<binary> --version` and compare against `minimum`.
pub fn check_tool_version(binary: &str, minimum: Option<&semver::Version>) -> ToolVersionCheck {
    let output = match Command::new(binary).arg("--version").output() {
        Ok(o) if o.status.success() => o,
        Ok(o) => {
            return ToolVersionCheck::Unknown {
                reason: format!("`{binary} --version` exited with {}", o.status),
            };
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ToolVersionCheck::Missing,
        Err(e) => {
            return ToolVersionCheck::Unknown {
                reason: format!("failed to run `{binary} --version`: {e}"),
            };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let Some(version) = parse_version_from_output(&stdout) else {
        return ToolVersionCheck::Unknown {
            reason: format!("could not parse version from `{}`", stdout.trim()),
        };
    };

    match minimum {
        Some(min) if version < *min => ToolVersionCheck::TooOld {
            found: version,
            minimum: min.clone(),
        },
        _ => ToolVersionCheck::Ok { version },
    }
}

/// Extract a version from tool output such as `uv 0.8.3 (7e78f54e7 2025-07-24)`
/// or `git version 2.39.3 (Apple Git-146)`.
///
/// Tokens that are not strict semver (`2.43.0.windows.1`, `0.9`) are read
/// leniently from their leading numeric components.
pub fn parse_version_from_output(output: &str) -> Option<semver::Version> {
    let tokens = || output.split_whitespace();
    tokens()
        .find_map(|token| semver::Version::parse(token.trim_start_matches('v')).ok())
        .or_else(|| tokens().find_map(lenient_version))
}

fn lenient_version(token: &str) -> Option<semver::Version> {
    let token = token.trim_start_matches('v');
    let mut parts = token
        .split('.')
        .map_while(|part| part.parse::<u64>().ok())
        .take(3);
    let major = parts.next()?;
    let minor = parts.next()?;
    let patch = parts.next().unwrap_or(0);
    Some(semver::Version::new(major, minor, patch))
}

/// Files in the project root that the tasks depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectFiles {
    /// `pyproject.toml` (package metadata, `uv build`).
    pub pyproject: bool,
    /// `uv.lock` (required by `--frozen` syncs and CI caching).
    pub uv_lock: bool,
    /// `.pre-commit-config.yaml`.
    pub pre_commit_config: bool,
    /// `cliff.toml` or a `[tool.git-cliff]` table.
    pub cliff_config: bool,
    /// commitizen config (`.cz.toml`, `cz.toml` or `[tool.commitizen]`).
    pub commitizen_config: bool,
}

/// Look for the files the tasks use.
#[instrument(fields(root = %root))]
pub fn detect_project_files(root: &Utf8Path) -> ProjectFiles {
    let pyproject_text = std::fs::read_to_string(root.join("pyproject.toml")).ok();
    let in_pyproject =
        |table: &str| pyproject_text.as_deref().is_some_and(|text| text.contains(table));

    let files = ProjectFiles {
        pyproject: pyproject_text.is_some(),
        uv_lock: root.join("uv.lock").is_file(),
        pre_commit_config: root.join(".pre-commit-config.yaml").is_file(),
        cliff_config: root.join("cliff.toml").is_file() || in_pyproject("[tool.git-cliff"),
        commitizen_config: root.join(".cz.toml").is_file()
            || root.join("cz.toml").is_file()
            || in_pyproject("[tool.commitizen]"),
    };
    debug!(?files, "project files");
    files
}
