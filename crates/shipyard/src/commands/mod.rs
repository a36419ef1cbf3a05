//! Command implementations

pub mod doctor;

pub mod emit;

pub mod info;

pub mod publish;

pub mod release;

pub mod task;

pub mod trigger;

pub mod workflow;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use shipyard_core::runner::SystemRunner;
use shipyard_core::step::{StepEvent, StepOutcome, StepReport};

/// The runner commands execute tools with.
///
/// With `--json`, stdout carries the report, so tool output is captured
/// instead of streamed.
pub const fn system_runner(json: bool) -> SystemRunner {
    if json {
        SystemRunner::quiet()
    } else {
        SystemRunner::streaming()
    }
}

/// Read an environment variable, treating non-UTF-8 values as unset.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders step progress: a spinner while a step runs, then one status line.
///
/// Silent in JSON mode; the final report carries the same information.
pub struct StepPrinter {
    json: bool,
    spinner: Option<ProgressBar>,
}

impl StepPrinter {
    /// Create a printer for the given output mode.
    pub const fn new(json: bool) -> Self {
        Self {
            json,
            spinner: None,
        }
    }

    /// Handle one progress event.
    pub fn handle(&mut self, event: StepEvent) {
        if self.json {
            return;
        }
        match event {
            StepEvent::Started {
                scope,
                step,
                command,
            } => {
                self.clear();
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg:.dimmed}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_prefix(format!("{scope} › {step}"));
                spinner.set_message(command);
                // No steady tick: streamed tool output shares the terminal.
                spinner.tick();
                self.spinner = Some(spinner);
            }
            StepEvent::Completed(report) => {
                self.clear();
                println!("{}", render_report(&report));
            }
        }
    }

    fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for StepPrinter {
    fn drop(&mut self) {
        self.clear();
    }
}

/// One status line for a finished step.
pub fn render_report(report: &StepReport) -> String {
    let label = format!("{} › {}", report.scope, report.name);
    match report.outcome {
        StepOutcome::Success { ref message } => {
            format!("{} {} {}", "✓".green(), label.bold(), message.dimmed())
        }
        StepOutcome::Tolerated { code } => {
            let code = code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
            format!(
                "{} {} {}",
                "!".yellow(),
                label.bold(),
                format!("exited with {code}, continuing").yellow()
            )
        }
        StepOutcome::Skipped { ref reason } => {
            format!(
                "{} {} {}",
                "○".dimmed(),
                label.bold(),
                format!("skipped: {reason}").dimmed()
            )
        }
    }
}

/// Closing line for a list of steps.
pub fn summary_line(what: &str, steps: &[StepReport], dry_run: bool) -> String {
    let count = steps.len();
    let noun = if count == 1 { "step" } else { "steps" };
    if dry_run {
        format!("{what}: dry run, {count} {noun} planned, nothing executed")
    } else {
        format!("{what}: done ({count} {noun})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: StepOutcome) -> StepReport {
        StepReport {
            scope: "restore-env".into(),
            name: "sync".into(),
            command: "uv sync --all-groups".into(),
            outcome,
        }
    }

    #[test]
    fn renders_each_outcome() {
        let line = render_report(&report(StepOutcome::Skipped {
            reason: "`.venv` already exists".into(),
        }));
        assert!(line.contains("restore-env › sync"));
        assert!(line.contains("skipped: `.venv` already exists"));

        let line = render_report(&report(StepOutcome::Tolerated { code: Some(1) }));
        assert!(line.contains("exited with code 1, continuing"));

        let line = render_report(&report(StepOutcome::Success {
            message: "ran: uv sync --all-groups".into(),
        }));
        assert!(line.contains("ran: uv sync --all-groups"));
    }

    #[test]
    fn summary_counts_steps() {
        let steps = vec![report(StepOutcome::Success {
            message: "ran".into(),
        })];
        assert_eq!(summary_line("clean", &steps, false), "clean: done (1 step)");
        assert_eq!(
            summary_line("clean", &[], true),
            "clean: dry run, 0 steps planned, nothing executed"
        );
    }

    #[test]
    fn json_printer_is_silent() {
        let mut printer = StepPrinter::new(true);
        printer.handle(StepEvent::Completed(report(StepOutcome::Skipped {
            reason: "x".into(),
        })));
        assert!(printer.spinner.is_none());
    }
}
