//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.shipyard.<ext>` in current directory or any parent
//! - `shipyard.<ext>` in current directory or any parent
//! - `~/.config/shipyard/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use shipyard_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::publish::TrustedPublishing;
use crate::tasks::SyncMode;

/// The configuration for shipyard.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// Every section is optional; unset values fall back to the defaults of the
/// task or job that reads them. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Developer task overrides.
    pub tasks: Option<TasksConfig>,
    /// Release job overrides.
    pub release: Option<ReleaseConfig>,
    /// Publish job overrides.
    pub publish: Option<PublishConfig>,
}

/// `[tasks]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TasksConfig {
    /// Environment directory checked by `restore-env` (default: `.venv`).
    pub env_dir: Option<Utf8PathBuf>,
    /// Install mode for `uv sync`: `"all-groups"` (default) or `"frozen-no-dev"`.
    pub sync: Option<SyncMode>,
    /// `bump-version` overrides.
    pub bump: Option<BumpTaskConfig>,
    /// `clean` overrides.
    pub clean: Option<CleanTaskConfig>,
    /// `precommit-run-all` overrides.
    pub precommit: Option<PrecommitTaskConfig>,
}

/// `[tasks.bump]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BumpTaskConfig {
    /// Run `restore-env` first (default: `true`).
    pub restore_env: Option<bool>,
    /// Pass `--no-verify` to the amend (default: `true`).
    pub no_verify: Option<bool>,
}

/// `[tasks.clean]` section.
///
/// # Example
///
/// ```toml
/// [tasks.clean]
/// tool = []            # skip the cleanup tool, remove targets only
/// targets = ["dist", "build", "htmlcov"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CleanTaskConfig {
    /// Cleanup tool argv (default: `["uvx", "cleanpy@0.5.1", "."]`). Empty disables it.
    pub tool: Option<Vec<String>>,
    /// Run `restore-env` first (default: `false`).
    pub restore_env: Option<bool>,
    /// Paths to remove, relative to the project root.
    pub targets: Option<Vec<Utf8PathBuf>>,
}

/// `[tasks.precommit]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PrecommitTaskConfig {
    /// Run `restore-env` first (default: `true`).
    pub restore_env: Option<bool>,
}

/// `[release]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Repository identifier (`owner/name`), overriding CI and remote detection.
    pub repository: Option<String>,
    /// Tag for releases not cut from a version tag (default: `nightly`).
    pub nightly_tag: Option<String>,
    /// Hold an exclusive lock while the release job runs (default: `false`).
    pub serialize_runs: Option<bool>,
}

/// `[publish]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PublishConfig {
    /// Interpreter request for `uv python install` (e.g. `"3.12"`).
    pub python: Option<String>,
    /// `--trusted-publishing` mode (default: `always`).
    pub trusted_publishing: Option<TrustedPublishing>,
    /// Upload endpoint, when not the default index.
    pub publish_url: Option<String>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "shipyard";

/// Prefix for environment overrides (`SHIPYARD_TASKS__SYNC=frozen-no-dev`).
const ENV_PREFIX: &str = "SHIPYARD_";

/// Files marking the root of a Python project, nearest first.
const PROJECT_MARKERS: &[&str] = &["pyproject.toml", ".git"];

/// Where a config file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `~/.config/shipyard/config.<ext>`.
    User,
    /// `.shipyard.<ext>` or `shipyard.<ext>` found walking up.
    Project,
    /// Passed with `--config`.
    Explicit,
}

/// A config file that takes part in loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSource {
    /// How it was found.
    pub kind: SourceKind,
    /// File path.
    pub path: Utf8PathBuf,
}

/// Builder for loading configuration from multiple sources.
#[derive(Debug)]
pub struct ConfigLoader {
    search_from: Option<Utf8PathBuf>,
    user_config: bool,
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader that reads user config and environment overrides and stops
    /// project discovery at a `.git` boundary.
    pub fn new() -> Self {
        Self {
            search_from: None,
            user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.search_from = Some(path.as_ref().to_path_buf());
        self
    }

    /// Include `~/.config/shipyard/config.<ext>`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.user_config = include;
        self
    }

    /// Stop walking up at a parent directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Walk up all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add a config file that overrides everything discovered.
    ///
    /// Later files take precedence over earlier ones.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Config files that would be merged, lowest precedence first.
    pub fn sources(&self) -> Vec<ConfigSource> {
        let user = self
            .user_config
            .then(find_user_config)
            .flatten()
            .map(|path| ConfigSource {
                kind: SourceKind::User,
                path,
            });
        let project = self
            .search_from
            .as_deref()
            .and_then(|start| self.find_project_config(start))
            .map(|path| ConfigSource {
                kind: SourceKind::Project,
                path,
            });
        let explicit = self.explicit_files.iter().map(|path| ConfigSource {
            kind: SourceKind::Explicit,
            path: path.clone(),
        });

        user.into_iter().chain(project).chain(explicit).collect()
    }

    /// Load configuration, merging all sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Explicit files (in order added via `with_file`)
    /// 2. `SHIPYARD_*` environment variables
    /// 3. Project config (closest to the search start)
    /// 4. User config
    /// 5. Default values
    #[tracing::instrument(skip(self), fields(search_from = ?self.search_from))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.sources();
        tracing::debug!(count = sources.len(), "loading configuration");

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let (explicit, discovered): (Vec<_>, Vec<_>) = sources
            .iter()
            .partition(|source| source.kind == SourceKind::Explicit);
        for source in discovered {
            figment = merge_file(figment, &source.path);
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        for source in explicit {
            figment = merge_file(figment, &source.path);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            sources = sources.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            if let Some(found) = config_file_in(dir) {
                return Some(found);
            }
            // The directory holding the marker is the last one searched.
            if self
                .boundary_marker
                .as_ref()
                .is_some_and(|marker| dir.join(marker).exists())
            {
                break;
            }
        }
        None
    }
}

/// `.shipyard.<ext>` (preferred) or `shipyard.<ext>` in `dir`.
fn config_file_in(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_EXTENSIONS.iter().find_map(|ext| {
        [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

/// Merge a config file into the figment, detecting format from extension.
fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// The directory tasks and jobs run in: the nearest ancestor of `start`
/// holding `pyproject.toml`, else the nearest holding `.git`, else `start`.
pub fn project_root(start: &Utf8Path) -> Utf8PathBuf {
    PROJECT_MARKERS
        .iter()
        .find_map(|marker| start.ancestors().find(|dir| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

fn utf8_dir(pick: impl FnOnce(&directories::ProjectDirs) -> &std::path::Path) -> Option<Utf8PathBuf> {
    let dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(pick(&dirs).to_path_buf()).ok()
}

/// User config directory (`~/.config/shipyard/` on Linux).
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    utf8_dir(directories::ProjectDirs::config_dir)
}

/// User cache directory (`~/.cache/shipyard/` on Linux).
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    utf8_dir(directories::ProjectDirs::cache_dir)
}

/// Machine-local data directory (`~/.local/share/shipyard/` on Linux).
///
/// Log files land here when nothing else is configured.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    utf8_dir(directories::ProjectDirs::data_local_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let loader = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker();

        // Should succeed with defaults even if no files found
        let config = loader.load().unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_single_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"log_level = "debug"
log_dir = "/tmp/shipyard"
"#,
        )
        .unwrap();

        // Convert to Utf8PathBuf for API call
        let config_path = Utf8PathBuf::try_from(config_path).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&config_path)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.log_dir.as_ref().map(|dir| dir.as_str()),
            Some("/tmp/shipyard")
        );
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();

        let base_config = tmp.path().join("base.toml");
        fs::write(&base_config, r#"log_level = "warn""#).unwrap();

        let override_config = tmp.path().join("override.toml");
        fs::write(&override_config, r#"log_level = "error""#).unwrap();

        // Convert to Utf8PathBuf for API calls
        let base_config = Utf8PathBuf::try_from(base_config).unwrap();
        let override_config = Utf8PathBuf::try_from(override_config).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&base_config)
            .with_file(&override_config)
            .load()
            .unwrap();

        // Later file wins
        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("src").join("deep");
        fs::create_dir_all(&sub_dir).unwrap();

        // Create config in project root
        let config_path = project_dir.join(".shipyard.toml");
        fs::write(&config_path, r#"log_level = "debug""#).unwrap();

        // Convert to Utf8PathBuf for API call
        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();

        // Search from deep subdirectory
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();

        // Create structure: /parent/config.toml, /parent/child/.git/, /parent/child/work/
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();

        // Config in parent (should NOT be found due to .git boundary)
        fs::write(parent.join(".shipyard.toml"), r#"log_level = "warn""#).unwrap();

        // .git marker in child
        fs::create_dir(child.join(".git")).unwrap();

        // Convert to Utf8PathBuf for API call
        let work = Utf8PathBuf::try_from(work).unwrap();

        // Search from work directory - should not find parent config
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(&work)
            .load()
            .unwrap();

        // Should get default since config is beyond boundary
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();

        // Project config
        let project_config = tmp.path().join(".shipyard.toml");
        fs::write(&project_config, r#"log_level = "warn""#).unwrap();

        // Explicit override
        let override_config = tmp.path().join("override.toml");
        fs::write(&override_config, r#"log_level = "error""#).unwrap();

        // Convert to Utf8PathBuf for API calls
        let tmp_path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let override_config = Utf8PathBuf::try_from(override_config).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&tmp_path)
            .with_file(&override_config)
            .load()
            .unwrap();

        // Explicit file wins over project config
        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_config_next_to_boundary_marker_is_found() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let work = repo.join("src").join("pkg");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(repo.join(".shipyard.toml"), r#"log_level = "debug""#).unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();
        let loader = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&work);
        let sources = loader.sources();
        let config = loader.load().unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(sources.len(), 1);
        assert!(sources[0].path.as_str().ends_with("repo/.shipyard.toml"));
    }

    #[test]
    fn test_user_config_dir() {
        // Should return Some on most systems
        let dir = user_config_dir();
        if let Some(path) = dir {
            assert!(path.as_str().contains("shipyard"));
        }
    }

    #[test]
    fn test_default_config_has_no_sections() {
        let config = Config::default();
        assert!(config.tasks.is_none());
        assert!(config.release.is_none());
        assert!(config.publish.is_none());
    }

    #[test]
    fn test_config_with_tasks_section() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[tasks]
env_dir = ".env"
sync = "frozen-no-dev"

[tasks.bump]
no_verify = false

[tasks.clean]
tool = []
targets = ["dist", "htmlcov"]
"#,
        )
        .unwrap();

        let config_path = Utf8PathBuf::try_from(config_path).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&config_path)
            .load()
            .unwrap();

        let tasks = config.tasks.unwrap();
        assert_eq!(tasks.env_dir.as_deref().map(Utf8Path::as_str), Some(".env"));
        assert_eq!(tasks.sync, Some(SyncMode::FrozenNoDev));
        assert_eq!(tasks.bump.unwrap().no_verify, Some(false));
        let clean = tasks.clean.unwrap();
        assert_eq!(clean.tool, Some(Vec::new()));
        assert_eq!(clean.targets.unwrap().len(), 2);
        assert!(tasks.precommit.is_none());
    }

    #[test]
    fn test_config_with_release_and_publish_sections() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
release:
  repository: acme/widgets
  serialize_runs: true
publish:
  python: "3.12"
  trusted_publishing: automatic
"#,
        )
        .unwrap();

        let config_path = Utf8PathBuf::try_from(config_path).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&config_path)
            .load()
            .unwrap();

        let release = config.release.unwrap();
        assert_eq!(release.repository.as_deref(), Some("acme/widgets"));
        assert_eq!(release.serialize_runs, Some(true));
        assert!(release.nightly_tag.is_none());
        let publish = config.publish.unwrap();
        assert_eq!(publish.python.as_deref(), Some("3.12"));
        assert_eq!(
            publish.trusted_publishing,
            Some(TrustedPublishing::Automatic)
        );
    }

    #[test]
    fn test_invalid_sync_mode_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "[tasks]\nsync = \"everything\"\n").unwrap();

        let config_path = Utf8PathBuf::try_from(config_path).unwrap();
        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&config_path)
            .load();

        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_config_ignores_unknown_sections() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
log_level = "warn"

[justfile]
path = "Justfile"
"#,
        )
        .unwrap();

        let config_path = Utf8PathBuf::try_from(config_path).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&config_path)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.tasks.is_none());
    }

    #[test]
    fn test_sources_lists_project_then_explicit() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(root.join("shipyard.yaml"), "log_level: warn\n").unwrap();
        let extra = root.join("extra.json");
        fs::write(&extra, r#"{"log_level": "error"}"#).unwrap();

        let loader = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&root)
            .with_file(&extra);
        let sources = loader.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, SourceKind::Project);
        assert_eq!(sources[0].path, root.join("shipyard.yaml"));
        assert_eq!(sources[1].kind, SourceKind::Explicit);

        assert_eq!(loader.load().unwrap().log_level, LogLevel::Error);
    }

    #[test]
    fn test_dotfile_preferred_over_plain_name() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(root.join("shipyard.toml"), "").unwrap();
        fs::write(root.join(".shipyard.toml"), "").unwrap();
        let sources = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&root)
            .sources();
        assert_eq!(sources[0].path, root.join(".shipyard.toml"));
    }

    #[test]
    fn test_project_root_prefers_pyproject() {
        let tmp = TempDir::new().unwrap();
        let repo = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let package = repo.join("packages/core");
        let deep = package.join("src/core");
        fs::create_dir_all(&deep).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(package.join("pyproject.toml"), "[project]\nname = \"core\"\n").unwrap();

        assert_eq!(project_root(&deep), package);
        assert_eq!(project_root(&repo.join("packages")), repo);
    }
}
