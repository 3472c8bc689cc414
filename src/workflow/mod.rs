//! Workflow Resolution Module
//!
//! Everything that happens before a command runs: definition model,
//! loading and validation, include expansion, variable merging, and
//! plan building.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (WorkflowDefinition, Step)
//! - [`repository`]: Definition loading, validation and caching
//! - [`includes`]: Recursive include resolution with cycle detection
//! - [`variables`]: Layered variable merging and substitution
//! - [`planner`]: Flattened, substituted execution plans

pub mod includes;
pub mod model;
pub mod planner;
pub mod repository;
pub mod variables;

pub use model::{Step, StepKind, WorkflowDefinition};
pub use planner::{PlanBuilder, ResolvedPlan, ResolvedStep};
pub use repository::Repository;
pub use variables::VariableMap;
