//! Plan Builder
//!
//! Turns a named workflow plus runtime overrides into a single
//! `ResolvedPlan`: one flattened, ordered step list with every
//! variable already substituted, and the final merged variable
//! mapping. All failures here are pre-execution; nothing has been
//! dispatched when a build error is returned.

use serde::Serialize;

use log::{debug, info};

use crate::config::GlobalConfig;
use crate::error::{Error, Result};

use super::includes;
use super::model::{Step, StepKind};
use super::repository::Repository;
use super::variables::{self, VariableMap};

/// A step with all variable content resolved, ready for dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedStep {
    /// Step name.
    pub name: String,
    /// Step type.
    pub kind: StepKind,
    /// Command with placeholders substituted.
    pub command: String,
    /// Arguments with placeholders substituted.
    pub args: Vec<String>,
    /// Environment with placeholder values substituted.
    pub env: VariableMap,
    /// Working directory, substituted.
    pub working_directory: Option<String>,
    /// Skip condition, substituted.
    pub condition: Option<String>,
    /// Continue with the plan if this step fails.
    pub ignore_errors: bool,
    /// Name of the workflow this step was flattened from.
    pub source: String,
}

/// The output of plan building: a flattened step sequence plus the
/// final merged variable layer. Consumed exactly once by the
/// dispatcher and otherwise immutable.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlan {
    /// Root workflow name.
    pub workflow: String,
    /// Root workflow description.
    pub description: String,
    /// Flattened, fully substituted steps: included workflows first
    /// (dependency order), then the root's own steps.
    pub steps: Vec<ResolvedStep>,
    /// Final merged variables.
    pub variables: VariableMap,
}

/// Builds resolved plans against a repository and the process-wide
/// configuration.
pub struct PlanBuilder<'a> {
    repository: &'a mut Repository,
    config: &'a GlobalConfig,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(repository: &'a mut Repository, config: &'a GlobalConfig) -> Self {
        Self { repository, config }
    }

    /// Resolves the named workflow into an executable plan.
    ///
    /// Merges variables in precedence order (configuration, each
    /// included workflow in resolution order, the root workflow,
    /// runtime overrides), flattens included steps ahead of the
    /// root's own, and substitutes every string field. Any failure
    /// aborts the whole build with zero side effects.
    pub fn build(&mut self, name: &str, overrides: &VariableMap) -> Result<ResolvedPlan> {
        let root = self.repository.load(name)?;
        let included = includes::resolve(self.repository, &root)?;

        // Merge variables across all layers
        let mut layers: Vec<&VariableMap> = Vec::with_capacity(included.len() + 3);
        let config_vars = self.config.variables();
        layers.push(&config_vars);
        for definition in &included {
            layers.push(&definition.variables);
        }
        layers.push(&root.variables);
        layers.push(overrides);
        let merged = variables::merge_layers(layers);

        debug!(
            "Merged {} variables for workflow '{}'",
            merged.len(),
            root.name
        );

        // Flatten: included workflows' steps in dependency order,
        // then the root's own steps
        let mut steps = Vec::new();
        for definition in &included {
            for step in &definition.steps {
                steps.push(resolve_step(step, &definition.name, &merged)?);
            }
        }
        for step in &root.steps {
            steps.push(resolve_step(step, &root.name, &merged)?);
        }

        info!(
            "Resolved plan for '{}': {} steps ({} from includes)",
            root.name,
            steps.len(),
            steps.len() - root.steps.len()
        );

        Ok(ResolvedPlan {
            workflow: root.name.clone(),
            description: root.description.clone(),
            steps,
            variables: merged,
        })
    }

    /// Runs variable resolution for the named workflow without
    /// building steps or dispatching anything.
    pub fn preview_variables(&mut self, name: &str, overrides: &VariableMap) -> Result<VariableMap> {
        let root = self.repository.load(name)?;
        let included = includes::resolve(self.repository, &root)?;

        let mut layers: Vec<&VariableMap> = Vec::with_capacity(included.len() + 3);
        let config_vars = self.config.variables();
        layers.push(&config_vars);
        for definition in &included {
            layers.push(&definition.variables);
        }
        layers.push(&root.variables);
        layers.push(overrides);

        Ok(variables::merge_layers(layers))
    }
}

/// Substitutes one step's string fields against the final merged
/// layer, producing its resolved form.
///
/// When a step declares no explicit args and its substituted command
/// contains whitespace, the command is split on whitespace into
/// command plus args, so `command: kubectl get pods` style one-liners
/// work without an args list.
fn resolve_step(step: &Step, source: &str, vars: &VariableMap) -> Result<ResolvedStep> {
    let missing = |placeholder: String| Error::MissingVariable {
        step: step.name.clone(),
        placeholder,
    };

    let mut command = variables::substitute(&step.command, vars).map_err(missing)?;

    let mut args = if step.args.is_empty() {
        Vec::new()
    } else {
        variables::substitute_all(&step.args, vars)
            .map_err(|p| Error::MissingVariable {
                step: step.name.clone(),
                placeholder: p,
            })?
    };

    if args.is_empty() && command.split_whitespace().nth(1).is_some() {
        let mut parts = command.split_whitespace().map(str::to_string);
        let head = parts.next().unwrap_or_default();
        args = parts.collect();
        command = head;
    }

    let mut env = VariableMap::new();
    for (key, value) in &step.env {
        let value = variables::substitute(value, vars).map_err(|p| Error::MissingVariable {
            step: step.name.clone(),
            placeholder: p,
        })?;
        env.insert(key.clone(), value);
    }

    let working_directory = match &step.working_directory {
        Some(dir) => Some(variables::substitute(dir, vars).map_err(|p| Error::MissingVariable {
            step: step.name.clone(),
            placeholder: p,
        })?),
        None => None,
    };

    let condition = match &step.condition {
        Some(cond) => Some(variables::substitute(cond, vars).map_err(|p| {
            Error::MissingVariable {
                step: step.name.clone(),
                placeholder: p,
            }
        })?),
        None => None,
    };

    Ok(ResolvedStep {
        name: step.name.clone(),
        kind: step.kind,
        command,
        args,
        env,
        working_directory,
        condition,
        ignore_errors: step.ignore_errors,
        source: source.to_string(),
    })
}
