//! Workflow Engine Facade
//!
//! Ties the configuration, repository, plan builder and dispatcher
//! together behind the two invocation-surface operations: execute a
//! named workflow, or preview its resolved variables without running
//! anything.
//!
//! # Example
//!
//! ```rust,no_run
//! use opsflow::execution::WorkflowEngine;
//! use opsflow::workflow::VariableMap;
//!
//! fn main() -> opsflow::Result<()> {
//!     let mut engine = WorkflowEngine::new("/srv/project")?;
//!
//!     let mut overrides = VariableMap::new();
//!     overrides.insert("REGISTRY_TAG".to_string(), "v2".to_string());
//!
//!     let report = engine.execute_workflow("deploy-operator", &overrides)?;
//!     report.as_result()?;
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use log::info;

use crate::config::GlobalConfig;
use crate::error::Result;
use crate::workflow::{PlanBuilder, Repository, ResolvedPlan, VariableMap};

use super::dispatcher::{Dispatcher, ExecutionReport};

/// Entry point for resolving and executing workflows.
///
/// One engine holds one repository cache, so repeated operations in
/// a single process reuse loaded definitions. Nothing persists
/// across processes.
pub struct WorkflowEngine {
    config: GlobalConfig,
    repository: Repository,
    dry_run: bool,
}

impl WorkflowEngine {
    /// Creates an engine rooted at the given project directory.
    ///
    /// Loads `{root}/config.yaml` (if present) and opens the
    /// repository at `{root}/workflows`.
    pub fn new(project_root: impl Into<PathBuf>) -> Result<Self> {
        let config = GlobalConfig::load(project_root)?;
        let repository = Repository::new(config.workflows_dir());

        info!("Project root: {}", config.project_root().display());

        Ok(Self {
            config,
            repository,
            dry_run: false,
        })
    }

    /// Enables or disables dry-run mode: plans are still fully
    /// resolved, but no step spawns a process.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Returns the project root.
    pub fn project_root(&self) -> &Path {
        self.config.project_root()
    }

    /// Resolves the named workflow into a plan without executing it.
    pub fn build_plan(&mut self, name: &str, overrides: &VariableMap) -> Result<ResolvedPlan> {
        PlanBuilder::new(&mut self.repository, &self.config).build(name, overrides)
    }

    /// Resolves and executes the named workflow.
    ///
    /// Resolution failures return `Err` before anything runs; step
    /// failures are reported through the returned `ExecutionReport`.
    pub fn execute_workflow(
        &mut self,
        name: &str,
        overrides: &VariableMap,
    ) -> Result<ExecutionReport> {
        let plan = self.build_plan(name, overrides)?;
        let mut dispatcher = Dispatcher::new(&mut self.repository, &self.config, self.dry_run);
        Ok(dispatcher.execute(&plan))
    }

    /// Previews the final merged variables for the named workflow.
    ///
    /// Runs the full resolution chain (load, include expansion,
    /// merge) but dispatches nothing.
    pub fn preview_variables(
        &mut self,
        name: &str,
        overrides: &VariableMap,
    ) -> Result<VariableMap> {
        PlanBuilder::new(&mut self.repository, &self.config).preview_variables(name, overrides)
    }

    /// Lists available workflow names.
    pub fn list_workflows(&self) -> Result<Vec<String>> {
        self.repository.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_workflow(dir: &Path, name: &str, yaml: &str) {
        let workflows = dir.join("workflows");
        fs::create_dir_all(&workflows).unwrap();
        fs::write(workflows.join(format!("{}.yaml", name)), yaml).unwrap();
    }

    #[test]
    fn test_execute_workflow_end_to_end() {
        let temp = tempdir().unwrap();
        write_workflow(
            temp.path(),
            "hello",
            "name: hello\nsteps:\n  - name: greet\n    type: shell\n    command: echo hello\n",
        );

        let mut engine = WorkflowEngine::new(temp.path()).unwrap();
        let report = engine.execute_workflow("hello", &VariableMap::new()).unwrap();

        assert!(report.success);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_execute_not_found() {
        let temp = tempdir().unwrap();
        let mut engine = WorkflowEngine::new(temp.path()).unwrap();

        assert!(engine
            .execute_workflow("ghost", &VariableMap::new())
            .is_err());
    }

    #[test]
    fn test_preview_uses_config_layer() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("config.yaml"),
            "registry:\n  tag: v1\n",
        )
        .unwrap();
        write_workflow(temp.path(), "deploy", "name: deploy\n");

        let mut engine = WorkflowEngine::new(temp.path()).unwrap();
        let vars = engine
            .preview_variables("deploy", &VariableMap::new())
            .unwrap();

        assert_eq!(vars.get("REGISTRY_TAG").unwrap(), "v1");
        assert!(vars.contains_key("PROJECT_ROOT"));
    }

    #[test]
    fn test_preview_full_precedence() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("config.yaml"), "x: \"1\"\n").unwrap();
        write_workflow(temp.path(), "base", "name: base\nvariables:\n  X: \"2\"\n");
        write_workflow(
            temp.path(),
            "main",
            "name: main\nincludes: [base]\nvariables:\n  X: \"3\"\n",
        );

        let mut engine = WorkflowEngine::new(temp.path()).unwrap();

        let mut overrides = VariableMap::new();
        overrides.insert("X".to_string(), "4".to_string());
        let vars = engine.preview_variables("main", &overrides).unwrap();
        assert_eq!(vars.get("X").unwrap(), "4");

        let vars = engine
            .preview_variables("main", &VariableMap::new())
            .unwrap();
        assert_eq!(vars.get("X").unwrap(), "3");
    }

    #[test]
    fn test_preview_is_idempotent_and_side_effect_free() {
        let temp = tempdir().unwrap();
        // The step would fail if it ever ran
        write_workflow(
            temp.path(),
            "risky",
            "name: risky\nvariables:\n  A: \"1\"\nsteps:\n  - name: boom\n    type: shell\n    command: \"false\"\n",
        );

        let mut engine = WorkflowEngine::new(temp.path()).unwrap();
        let first = engine
            .preview_variables("risky", &VariableMap::new())
            .unwrap();
        let second = engine
            .preview_variables("risky", &VariableMap::new())
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.get("A").unwrap(), "1");
    }

    #[test]
    fn test_dry_run_spawns_nothing() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("marker");
        write_workflow(
            temp.path(),
            "touchy",
            &format!(
                "name: touchy\nsteps:\n  - name: touch\n    type: shell\n    command: touch {}\n",
                marker.display()
            ),
        );

        let mut engine = WorkflowEngine::new(temp.path()).unwrap();
        engine.set_dry_run(true);
        let report = engine
            .execute_workflow("touchy", &VariableMap::new())
            .unwrap();

        assert!(report.success);
        assert!(!marker.exists());
    }

    #[test]
    fn test_list_workflows() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "b", "name: b\n");
        write_workflow(temp.path(), "a", "name: a\n");

        let engine = WorkflowEngine::new(temp.path()).unwrap();
        assert_eq!(engine.list_workflows().unwrap(), vec!["a", "b"]);
    }
}
