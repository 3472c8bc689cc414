//! Workflow Execution Module
//!
//! Dispatches resolved plans to external executors, strictly one
//! step at a time.
//!
//! # Architecture
//!
//! - [`engine`]: Facade tying resolution and dispatch together
//! - [`dispatcher`]: Sequential step routing and the execution report
//! - [`runner`]: Process spawning for the external executor kinds

pub mod dispatcher;
pub mod engine;
pub mod runner;

pub use dispatcher::{Dispatcher, ExecutionReport, StepOutcome, StepRecord};
pub use engine::WorkflowEngine;
