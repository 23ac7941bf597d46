//! Test runner: executes a scenario and turns its step log into a report.
//!
//! The runner is the only place where a scenario error becomes a process
//! outcome. A scenario is fail-fast: the first error ends it and the
//! remaining steps never start.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::api::ApiClient;
use crate::harness::context::ScenarioContext;
use crate::harness::error::HarnessResult;
use crate::harness::step::{StepRecord, StepStatus};

/// Runner options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Treat abandoned steps as failures.
    pub strict_steps: bool,
}

/// Outcome of one scenario run.
#[derive(Debug, Clone)]
pub struct TestReport {
    /// Scenario name.
    pub name: String,
    /// Every step in start order.
    pub steps: Vec<StepRecord>,
    /// Error that ended the scenario, if any.
    pub error: Option<String>,
    /// Free-form notes added by the scenario.
    pub notes: Vec<String>,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Local>,
    /// Total run time.
    pub elapsed: Duration,
    /// Whether abandoned steps fail the run.
    pub strict_steps: bool,
}

impl TestReport {
    /// Returns `true` if the scenario completed and no step failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self.failed_step().is_none()
            && !(self.strict_steps && self.abandoned_count() > 0)
    }

    /// The failing step, if any. Fail-fast guarantees at most one.
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    /// Number of passed steps.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(|s| *s == StepStatus::Passed)
    }

    /// Number of abandoned steps.
    #[must_use]
    pub fn abandoned_count(&self) -> usize {
        self.count(|s| *s == StepStatus::Abandoned)
    }

    fn count(&self, predicate: impl Fn(&StepStatus) -> bool) -> usize {
        self.steps.iter().filter(|s| predicate(&s.status)).count()
    }

    /// Process exit status: 0 when passed, 1 otherwise.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        u8::from(!self.passed())
    }

    /// Process exit code for `main`.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Prints the step log and summary to stdout.
    pub fn print(&self) {
        println!("\n{}", "Steps:".cyan());

        for step in &self.steps {
            let elapsed = step
                .elapsed
                .map(|d| format!("({} ms)", d.as_millis()))
                .unwrap_or_default();

            match &step.status {
                StepStatus::Passed => {
                    println!("  {} {} {}", "✓".green(), step.name, elapsed.dimmed());
                }
                StepStatus::Failed(reason) => {
                    println!(
                        "  {} {} {}",
                        "✗".red().bold(),
                        step.name.red().bold(),
                        elapsed.dimmed()
                    );
                    println!("      {}", reason.red());
                }
                StepStatus::Abandoned => {
                    println!("  {} {} {}", "○".yellow(), step.name, "(abandoned)".yellow());
                }
                StepStatus::Pending => {
                    println!("  {} {}", "…".dimmed(), step.name.dimmed());
                }
            }
        }

        for note in &self.notes {
            println!("  {} {}", "note:".blue(), note.dimmed());
        }

        let summary = format!(
            "{}/{} steps passed in {:.2}s",
            self.passed_count(),
            self.steps.len(),
            self.elapsed.as_secs_f64()
        );

        if self.passed() {
            println!(
                "\n{} {} {}\n",
                "✓".green().bold(),
                "Test Passed".green().bold(),
                summary.dimmed()
            );
            return;
        }

        println!(
            "\n{} {} {}",
            "✗".red().bold(),
            "Test Failed".red().bold(),
            summary.dimmed()
        );
        if let Some(step) = self.failed_step() {
            println!("  Failed step: {}", step.name.red().bold());
        }
        if let Some(error) = &self.error {
            println!("  Error: {}", error.red());
        }
        if self.strict_steps && self.abandoned_count() > 0 {
            println!(
                "  {} abandoned step(s) with strict step checking enabled",
                self.abandoned_count()
            );
        }
        println!();
    }
}

/// Runs `scenario` against `client`, prints the report and returns it.
///
/// Steps still pending when the scenario returns are marked abandoned.
pub async fn run_test<F, Fut>(
    name: &str,
    work_dir: impl Into<PathBuf>,
    client: ApiClient,
    options: RunOptions,
    scenario: F,
) -> TestReport
where
    F: FnOnce(ScenarioContext) -> Fut,
    Fut: Future<Output = HarnessResult<()>>,
{
    let started_at = Local::now();
    let clock = Instant::now();
    let ctx = ScenarioContext::new(name, work_dir, client);

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        name.white().bold()
    );
    println!(
        "  {}",
        format!(
            "{} against {}, artifacts in {}",
            started_at.format("%Y-%m-%d %H:%M:%S"),
            ctx.api().base_url(),
            ctx.work_dir().display()
        )
        .dimmed()
    );

    let log = ctx.log().clone();

    let error = match scenario(ctx).await {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(scenario = name, error = %e, "Scenario aborted");
            Some(e.to_string())
        }
    };

    log.abandon_pending();

    let report = TestReport {
        name: name.to_string(),
        steps: log.records(),
        error,
        notes: log.notes(),
        started_at,
        elapsed: clock.elapsed(),
        strict_steps: options.strict_steps,
    };

    report.print();
    report
}
