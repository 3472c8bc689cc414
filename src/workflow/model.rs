//! Workflow Data Model
//!
//! Core data structures representing workflow definitions and their steps.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: deploy-operator
//! description: Build and deploy the operator image
//! includes:
//!   - setup-namespace
//! variables:
//!   REGISTRY_TAG: latest
//! steps:
//!   - name: build image
//!     type: tool
//!     command: build-image
//!     args: ["--tag", "${REGISTRY_TAG}"]
//!
//!   - name: rollout
//!     type: kubectl
//!     command: rollout
//!     args: ["restart", "deployment/operator"]
//!     ignore_errors: true
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::variables::VariableMap;

/// Closed set of step types the dispatcher knows how to route.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// A plain shell command.
    Shell,
    /// A cluster-control CLI subcommand.
    Kubectl,
    /// A subcommand of the companion admin tool.
    Tool,
    /// A nested workflow invoked by name.
    Workflow,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Shell => "shell",
            Self::Kubectl => "kubectl",
            Self::Tool => "tool",
            Self::Workflow => "workflow",
        };
        write!(f, "{}", tag)
    }
}

/// A single unit of execution within a workflow.
///
/// Steps are immutable value data owned by their definition; the
/// plan builder copies and rewrites argument strings during variable
/// substitution rather than mutating the original.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Step {
    /// Step name, used for logging and error reporting.
    pub name: String,

    /// Step type, routing it to the matching executor.
    #[serde(rename = "type")]
    pub kind: StepKind,

    /// Command to run. For `kubectl` and `tool` steps this is the
    /// subcommand; for `workflow` steps it is the workflow name.
    pub command: String,

    /// Ordered argument list, may contain `${VAR}` placeholders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables for the spawned process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Directory to run the command in (defaults to the project root).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Skip the step unless this substitutes to "true".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Continue with the remaining plan if this step fails.
    #[serde(default)]
    pub ignore_errors: bool,
}

impl Step {
    /// Creates a new step with the given name, kind and command.
    ///
    /// # Example
    ///
    /// ```
    /// use opsflow::workflow::{Step, StepKind};
    ///
    /// let step = Step::new("apply manifests", StepKind::Kubectl, "apply")
    ///     .with_args(["-f", "manifests/"])
    ///     .with_ignore_errors(true);
    /// ```
    pub fn new(name: impl Into<String>, kind: StepKind, command: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            kind,
            command: command.into().trim().to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
            condition: None,
            ignore_errors: false,
        }
    }

    /// Sets the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Sets the skip condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Sets the continue-on-failure flag.
    pub fn with_ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }
}

/// A complete named workflow definition.
///
/// Loaded once per resolution pass and immutable after load. Owned
/// by the repository; the include resolver and plan builder hold
/// only shared references.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkflowDefinition {
    /// Unique name, must match the file it was loaded from.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Names of workflows whose steps and variables are incorporated
    /// before this workflow's own, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Variable defaults declared by this workflow.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: VariableMap,

    /// Ordered list of steps.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl WorkflowDefinition {
    /// Creates an empty definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            includes: Vec::new(),
            variables: VariableMap::new(),
            steps: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends an include.
    pub fn with_include(mut self, name: impl Into<String>) -> Self {
        self.includes.push(name.into());
        self
    }

    /// Sets a variable default.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Appends a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Checks field-level validity, returning a list of problems.
    ///
    /// `expected_name` is the file stem the definition was loaded
    /// from; the declared name must match it so that includes resolve
    /// to the workflow they name.
    pub fn validate(&self, expected_name: &str) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("'name' field is empty".to_string());
        } else if self.name != expected_name {
            problems.push(format!(
                "'name' field is '{}' but the file is '{}'",
                self.name, expected_name
            ));
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                problems.push(format!("step #{} has an empty 'name'", index + 1));
                continue;
            }
            if step.command.trim().is_empty() {
                problems.push(format!("step '{}' has an empty 'command'", step.name));
            }
        }

        problems
    }
}
