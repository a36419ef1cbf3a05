//! External tool invocation.
//!
//! Every command shipyard issues (`uv`, `git`, `git-cliff`, `gh`, ...) is
//! described as a [`ToolInvocation`] and handed to a [`ToolRunner`]. The
//! orchestration modules never spawn processes themselves, so a recording
//! runner can stand in for the real tools in tests.

use std::fmt;
use std::process::{Command, Stdio};

use camino::Utf8Path;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from running an external tool.
#[derive(Error, Debug)]
pub enum RunError {
    /// The process could not be started (binary missing, permissions, ...).
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("`{command}` exited with {}: {stderr}", describe_code(.code))]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code (`None` when killed by a signal).
        code: Option<i32>,
        /// Captured stderr, trimmed. Empty when output was streamed.
        stderr: String,
    },
}

/// Result alias for tool invocations.
pub type RunResult<T> = Result<T, RunError>;

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

/// How a tool's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream to the user's terminal (unless the runner is quiet).
    #[default]
    Inherit,
    /// Capture for shipyard to consume (changelog text, release URL).
    Capture,
}

/// A single external command: program, arguments, extra environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    /// Program name, resolved through `PATH`.
    pub program: String,
    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<(String, String)>,
    /// Output handling.
    #[serde(skip)]
    pub output: OutputMode,
}

impl ToolInvocation {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            output: OutputMode::Inherit,
        }
    }

    /// Build an invocation from an argv list (`["uvx", "cleanpy@0.5.1", "."]`).
    ///
    /// Returns `None` for an empty list.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.as_ref()).args(rest.iter().map(AsRef::as_ref)))
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Capture stdout/stderr instead of streaming them.
    #[must_use]
    pub const fn captured(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code (`None` when killed by a signal).
    pub code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Captured stdout (empty when streamed).
    pub stdout: String,
    /// Captured stderr (empty when streamed).
    pub stderr: String,
}

/// Runs [`ToolInvocation`]s.
pub trait ToolRunner {
    /// Run the invocation in `cwd` and report how it exited.
    ///
    /// A non-zero exit is *not* an error here; see [`ToolRunner::run_checked`].
    fn run(&self, invocation: &ToolInvocation, cwd: &Utf8Path) -> RunResult<ToolOutput>;

    /// Run the invocation and turn an unsuccessful exit into [`RunError::Failed`].
    fn run_checked(&self, invocation: &ToolInvocation, cwd: &Utf8Path) -> RunResult<ToolOutput> {
        let output = self.run(invocation, cwd)?;
        if output.success {
            Ok(output)
        } else {
            Err(RunError::Failed {
                command: invocation.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Spawns real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy)]
pub struct SystemRunner {
    stream: bool,
}

impl SystemRunner {
    /// A runner that lets [`OutputMode::Inherit`] tools write to the terminal.
    pub const fn streaming() -> Self {
        Self { stream: true }
    }

    /// A runner that captures all tool output (used with `--json`, where
    /// stdout belongs to shipyard's own report).
    pub const fn quiet() -> Self {
        Self { stream: false }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::streaming()
    }
}

impl ToolRunner for SystemRunner {
    #[instrument(skip_all, fields(command = %invocation, %cwd))]
    fn run(&self, invocation: &ToolInvocation, cwd: &Utf8Path) -> RunResult<ToolOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(cwd.as_std_path());

        let spawn_err = |source| RunError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        let output = if self.stream && invocation.output == OutputMode::Inherit {
            debug!("running tool (streamed)");
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(spawn_err)?;
            ToolOutput {
                code: status.code(),
                success: status.success(),
                ..ToolOutput::default()
            }
        } else {
            debug!("running tool (captured)");
            let output = command
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_err)?;
            ToolOutput {
                code: output.status.code(),
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }
        };

        debug!(code = ?output.code, success = output.success, "tool finished");
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A runner that records invocations and answers from a closure.

    use std::cell::RefCell;

    use super::*;

    type Responder = Box<dyn Fn(&ToolInvocation, &Utf8Path) -> ToolOutput>;

    pub(crate) struct RecordingRunner {
        calls: RefCell<Vec<ToolInvocation>>,
        responder: Responder,
    }

    impl RecordingRunner {
        /// Every invocation succeeds with empty output.
        pub(crate) fn succeeding() -> Self {
            Self::with_responder(|_, _| ok(""))
        }

        pub(crate) fn with_responder(
            responder: impl Fn(&ToolInvocation, &Utf8Path) -> ToolOutput + 'static,
        ) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                responder: Box::new(responder),
            }
        }

        pub(crate) fn calls(&self) -> Vec<ToolInvocation> {
            self.calls.borrow().clone()
        }

        /// Rendered command lines, in call order.
        pub(crate) fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(ToString::to_string).collect()
        }
    }

    impl ToolRunner for RecordingRunner {
        fn run(&self, invocation: &ToolInvocation, cwd: &Utf8Path) -> RunResult<ToolOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok((self.responder)(invocation, cwd))
        }
    }

    pub(crate) fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            code: Some(0),
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub(crate) fn failed(code: i32, stderr: &str) -> ToolOutput {
        ToolOutput {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}
