//! Step Dispatcher
//!
//! Consumes a resolved plan, routing each step to the matching
//! external executor in strict sequential order. All variable
//! content is already resolved by the plan builder; the dispatcher
//! never rewrites arguments.
//!
//! A failing step stops the plan unless it carries `ignore_errors`.
//! Nested `workflow` steps recursively build and execute the named
//! workflow with the current merged variables as its runtime
//! overrides, guarded by a dispatch stack and a depth limit.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::GlobalConfig;
use crate::error::{Error, Result};
use crate::workflow::{PlanBuilder, Repository, ResolvedPlan, ResolvedStep, StepKind};

use super::runner::{CommandRunner, KubectlRunner, ShellRunner, ToolRunner};

/// Maximum nesting depth for `workflow`-type steps. The include
/// resolver already rejects static cycles; this bounds re-entry
/// through nested execution at runtime.
pub const MAX_WORKFLOW_DEPTH: usize = 16;

/// Final status of one dispatched step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    /// Step ran and exited successfully.
    Succeeded,
    /// Step ran and failed; carries the exit status label.
    Failed(String),
    /// Step was not run (condition false, or dry run).
    Skipped,
}

/// Record of one step's dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// 1-based position in the flattened plan.
    pub position: usize,
    /// Workflow the step was flattened from.
    pub source: String,
    /// When dispatch started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Final status.
    pub outcome: StepOutcome,
    /// Captured output (stdout, with stderr appended on failure).
    pub output: String,
}

/// Append-only account of one plan's execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Root workflow name.
    pub workflow: String,
    /// Per-step records, in dispatch order.
    pub records: Vec<StepRecord>,
    /// True if no fatal step failure occurred.
    pub success: bool,
    /// Name of the step the run failed at, if any.
    pub failed_step: Option<String>,
}

impl ExecutionReport {
    fn new(workflow: &str) -> Self {
        Self {
            workflow: workflow.to_string(),
            records: Vec::new(),
            success: true,
            failed_step: None,
        }
    }

    /// Converts a failed run into a `StepFailed` error; a successful
    /// run maps to `Ok(())`.
    pub fn as_result(&self) -> Result<()> {
        if self.success {
            return Ok(());
        }

        let failed_step = self.failed_step.as_deref().unwrap_or_default();
        let record = self
            .records
            .iter()
            .rev()
            .find(|r| r.name == failed_step && matches!(r.outcome, StepOutcome::Failed(_)));

        let (position, status) = match record {
            Some(record) => {
                let status = match &record.outcome {
                    StepOutcome::Failed(status) => status.clone(),
                    _ => String::new(),
                };
                (record.position, status)
            }
            None => (0, "unknown failure".to_string()),
        };

        Err(Error::StepFailed {
            step: failed_step.to_string(),
            position,
            status,
        })
    }
}

/// Routes resolved steps to their executors, sequentially.
pub struct Dispatcher<'a> {
    repository: &'a mut Repository,
    config: &'a GlobalConfig,
    project_root: PathBuf,
    dry_run: bool,
    /// Workflow names currently on the dispatch stack, outermost
    /// first. Guards against runtime re-entry via nested steps.
    active: Vec<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(repository: &'a mut Repository, config: &'a GlobalConfig, dry_run: bool) -> Self {
        let project_root = config.project_root().to_path_buf();
        Self {
            repository,
            config,
            project_root,
            dry_run,
            active: Vec::new(),
        }
    }

    /// Executes the plan's steps in flattened order.
    ///
    /// Stops at the first failing step without `ignore_errors` and
    /// marks the report failed at that step; with the flag set, the
    /// failure is recorded and dispatch continues.
    pub fn execute(&mut self, plan: &ResolvedPlan) -> ExecutionReport {
        info!("Executing workflow: {}", plan.workflow);
        if !plan.description.is_empty() {
            info!("Description: {}", plan.description);
        }

        self.active.push(plan.workflow.clone());
        let mut report = ExecutionReport::new(&plan.workflow);
        let total = plan.steps.len();

        for (index, step) in plan.steps.iter().enumerate() {
            let position = index + 1;
            info!("[{}/{}] {}", position, total, step.name);

            let started_at = Utc::now();
            let start = std::time::Instant::now();

            let outcome = self.dispatch(step, plan);
            let duration_ms = start.elapsed().as_millis() as u64;

            let (outcome, output) = match outcome {
                DispatchResult::Ran(outcome, output) => (outcome, output),
                DispatchResult::Skipped(reason) => {
                    info!("  Skipping: {}", reason);
                    (StepOutcome::Skipped, reason)
                }
            };

            let fatal = matches!(outcome, StepOutcome::Failed(_)) && !step.ignore_errors;
            let failed = matches!(outcome, StepOutcome::Failed(_));

            report.records.push(StepRecord {
                name: step.name.clone(),
                position,
                source: step.source.clone(),
                started_at,
                duration_ms,
                outcome,
                output,
            });

            if fatal {
                error!("Workflow failed at step {}: {}", position, step.name);
                report.success = false;
                report.failed_step = Some(step.name.clone());
                break;
            }

            if failed {
                warn!(
                    "Step {} failed but continuing due to ignore_errors",
                    position
                );
            }
        }

        self.active.pop();

        if report.success {
            info!("Workflow '{}' completed successfully", plan.workflow);
        }
        report
    }

    fn dispatch(&mut self, step: &ResolvedStep, plan: &ResolvedPlan) -> DispatchResult {
        if let Some(condition) = &step.condition {
            if !condition.trim().eq_ignore_ascii_case("true") {
                return DispatchResult::Skipped(format!("condition is '{}'", condition));
            }
        }

        if self.dry_run {
            println!("[DRY RUN] {} ({})", step.name, step.kind);
            println!("  Command: {} {}", step.command, step.args.join(" "));
            return DispatchResult::Skipped("dry run".to_string());
        }

        match step.kind {
            StepKind::Shell => self.run_command(step, &ShellRunner),
            StepKind::Kubectl => self.run_command(step, &KubectlRunner),
            StepKind::Tool => self.run_command(step, &ToolRunner),
            StepKind::Workflow => self.run_nested(step, plan),
        }
    }

    fn run_command(&self, step: &ResolvedStep, runner: &dyn CommandRunner) -> DispatchResult {
        let cwd = match &step.working_directory {
            Some(dir) => self.project_root.join(dir),
            None => self.project_root.clone(),
        };

        match runner.run(&step.command, &step.args, &step.env, &cwd) {
            Ok(output) => {
                if !output.stdout.trim().is_empty() {
                    debug!("Step '{}' output:\n{}", step.name, output.stdout);
                }

                if output.success() {
                    DispatchResult::Ran(StepOutcome::Succeeded, output.stdout)
                } else {
                    error!("Step '{}' failed with {}", step.name, output.status_label());
                    if !output.stderr.trim().is_empty() {
                        error!("stderr:\n{}", output.stderr);
                    }

                    let status_label = output.status_label();
                    let mut captured = output.stdout;
                    captured.push_str(&output.stderr);
                    DispatchResult::Ran(StepOutcome::Failed(status_label), captured)
                }
            }
            Err(e) => {
                error!("Step '{}' could not be spawned: {}", step.name, e);
                DispatchResult::Ran(StepOutcome::Failed(e.to_string()), String::new())
            }
        }
    }

    /// Executes a nested workflow, passing the current merged
    /// variables down as its runtime overrides.
    fn run_nested(&mut self, step: &ResolvedStep, plan: &ResolvedPlan) -> DispatchResult {
        let name = step.command.as_str();
        info!("  Executing nested workflow: {}", name);

        if self.active.iter().any(|n| n == name) {
            let mut chain = self.active.clone();
            chain.push(name.to_string());
            let err = Error::CircularInclude {
                cycle: chain.join(" -> "),
            };
            return DispatchResult::Ran(StepOutcome::Failed(err.to_string()), String::new());
        }

        if self.active.len() >= MAX_WORKFLOW_DEPTH {
            let err = Error::RecursionLimit {
                workflow: name.to_string(),
                depth: MAX_WORKFLOW_DEPTH,
            };
            return DispatchResult::Ran(StepOutcome::Failed(err.to_string()), String::new());
        }

        let nested_plan =
            match PlanBuilder::new(self.repository, self.config).build(name, &plan.variables) {
                Ok(nested_plan) => nested_plan,
                Err(e) => {
                    return DispatchResult::Ran(StepOutcome::Failed(e.to_string()), String::new())
                }
            };

        let nested_report = self.execute(&nested_plan);
        let summary = format!(
            "nested workflow '{}': {} steps, {}",
            name,
            nested_report.records.len(),
            if nested_report.success {
                "succeeded".to_string()
            } else {
                format!(
                    "failed at '{}'",
                    nested_report.failed_step.as_deref().unwrap_or("?")
                )
            }
        );

        if nested_report.success {
            DispatchResult::Ran(StepOutcome::Succeeded, summary)
        } else {
            DispatchResult::Ran(StepOutcome::Failed(summary.clone()), summary)
        }
    }
}

enum DispatchResult {
    Ran(StepOutcome, String),
    Skipped(String),
}
