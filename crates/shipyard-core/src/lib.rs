//! Core library for shipyard.
//!
//! Developer tasks and tag-driven release automation for uv-managed Python
//! packages. Every external tool call is described as a
//! [`ToolInvocation`](runner::ToolInvocation) and executed by a
//! [`ToolRunner`](runner::ToolRunner), in a fixed order with no retries.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading and management
//! - [`detect`] - External tool and project file detection
//! - [`error`] - Configuration error types
//! - [`git`] - Read-only git queries
//! - [`lock`] - Exclusive lock for serialized release runs
//! - [`publish`] - The gated publish job
//! - [`release`] - The changelog and hosted release job
//! - [`runner`] - Tool invocation and the runner seam
//! - [`step`] - Ordered steps and progress events
//! - [`tasks`] - `restore-env`, `bump-version`, `clean`, `precommit-run-all`
//! - [`trigger`] - Resolving what started a release run
//! - [`workflow`] - Running both jobs, and the CI workflow definition
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use shipyard_core::runner::SystemRunner;
//! use shipyard_core::tasks::{TaskName, TaskRunner, TaskSettings};
//! use shipyard_core::ConfigLoader;
//!
//! let root = Utf8Path::new(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(root)
//!     .load()
//!     .expect("Failed to load configuration");
//! let settings = TaskSettings::from_config(&config);
//! let runner = SystemRunner::streaming();
//!
//! TaskRunner::new(root, &settings, &runner)
//!     .run(TaskName::RestoreEnv, &mut |_| {})
//!     .expect("restore-env failed");
//! ```
#![deny(unsafe_code)]

pub mod config;

pub mod detect;

pub mod error;

pub mod git;

pub mod lock;

pub mod publish;

pub mod release;

pub mod runner;

pub mod step;

pub mod tasks;

pub mod trigger;

pub mod workflow;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
