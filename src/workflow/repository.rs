//! Workflow Definition Repository
//!
//! Loads named workflow definitions from YAML files in a workflows
//! directory, validates them on read, and caches them for the
//! duration of one resolution pass. Nothing is persisted across
//! separate invocations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::error::{Error, Result};

use super::model::WorkflowDefinition;

/// Repository of workflow definitions backed by a directory of
/// `{name}.yaml` files.
///
/// Repeated loads of the same name within one repository instance
/// are served from cache, so every consumer of a definition sees
/// the same immutable `Arc`.
pub struct Repository {
    workflows_dir: PathBuf,
    cache: HashMap<String, Arc<WorkflowDefinition>>,
}

impl Repository {
    /// Creates a repository over the given workflows directory.
    ///
    /// The directory does not need to exist yet; a missing directory
    /// simply means every load fails with `NotFound`.
    pub fn new(workflows_dir: impl Into<PathBuf>) -> Self {
        Self {
            workflows_dir: workflows_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Returns the backing directory.
    pub fn workflows_dir(&self) -> &Path {
        &self.workflows_dir
    }

    /// Loads and validates the definition with the given name.
    ///
    /// Fails with `NotFound` if `{dir}/{name}.yaml` does not exist,
    /// or with `Validation` if the file is malformed: unparseable
    /// YAML, unknown step type, empty or mismatched `name`, a step
    /// with no name, or a step with no command. Invalid definitions
    /// are never silently defaulted.
    pub fn load(&mut self, name: &str) -> Result<Arc<WorkflowDefinition>> {
        if let Some(definition) = self.cache.get(name) {
            debug!("Workflow '{}' served from cache", name);
            return Ok(Arc::clone(definition));
        }

        let path = self.workflows_dir.join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(Error::NotFound {
                name: name.to_string(),
                path: self.workflows_dir.display().to_string(),
            });
        }

        debug!("Loading workflow definition: {}", path.display());
        let content = fs::read_to_string(&path)?;

        let definition: WorkflowDefinition = serde_yaml::from_str(&content)
            .map_err(|e| Error::validation(name, e.to_string()))?;

        let problems = definition.validate(name);
        if !problems.is_empty() {
            return Err(Error::validation(name, problems.join("; ")));
        }

        info!(
            "Loaded workflow '{}': {} includes, {} steps",
            definition.name,
            definition.includes.len(),
            definition.steps.len()
        );

        let definition = Arc::new(definition);
        self.cache.insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Lists available workflow names, sorted.
    ///
    /// A missing workflows directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.workflows_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.workflows_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
