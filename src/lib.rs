//! opsflow - Declarative Workflow Engine for Cluster Operations
//!
//! Resolves named YAML workflow definitions (with recursive includes
//! and layered variable defaults) into flattened, fully-parameterized
//! execution plans, then runs them against external executors: shell
//! commands, the cluster-control CLI, a companion admin tool, and
//! nested workflows.
//!
//! # Architecture
//!
//! The library is organized into three main modules:
//!
//! - [`config`]: Global configuration, the lowest-precedence variable layer
//! - [`workflow`]: Definitions, include resolution, variable merging, planning
//! - [`execution`]: Sequential step dispatch against external executors
//!
//! Resolution is strictly separated from execution: every
//! `NotFound`, `Validation`, `CircularInclude` or `MissingVariable`
//! failure happens before any process spawns.
//!
//! # Example
//!
//! ```rust,no_run
//! use opsflow::execution::WorkflowEngine;
//! use opsflow::workflow::VariableMap;
//!
//! fn main() -> opsflow::Result<()> {
//!     let mut engine = WorkflowEngine::new(".")?;
//!
//!     // Inspect the merged variables without running anything
//!     let vars = engine.preview_variables("deploy-operator", &VariableMap::new())?;
//!     println!("{} variables resolved", vars.len());
//!
//!     // Execute for real
//!     let report = engine.execute_workflow("deploy-operator", &VariableMap::new())?;
//!     report.as_result()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod workflow;

// Re-export commonly used types
pub use config::GlobalConfig;
pub use error::{Error, Result};
pub use execution::{ExecutionReport, WorkflowEngine};
pub use workflow::{ResolvedPlan, Step, StepKind, VariableMap, WorkflowDefinition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "opsflow";
