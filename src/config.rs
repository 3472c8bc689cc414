//! Global Configuration
//!
//! Loads `config.yaml` from the project root and exposes it as the
//! lowest-precedence variable layer. Nested mappings are flattened
//! into `UPPER_SNAKE` variable names, so `github.fork_org` becomes
//! `GITHUB_FORK_ORG`.
//!
//! The configuration is constructed once per process invocation,
//! passed by reference, and never mutated after construction.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_yaml::Value;

use crate::error::Result;
use crate::workflow::VariableMap;

/// Configuration file name expected in the project root.
pub const CONFIG_FILE: &str = "config.yaml";

/// Directory of workflow definitions, relative to the project root.
pub const WORKFLOWS_DIR: &str = "workflows";

/// Read-only, process-wide configuration.
pub struct GlobalConfig {
    project_root: PathBuf,
    document: Value,
}

impl GlobalConfig {
    /// Loads configuration from `{project_root}/config.yaml`.
    ///
    /// A missing file yields an empty configuration. An unreadable or
    /// unparseable file is logged as a warning and also treated as
    /// empty, so a broken config never blocks workflows that do not
    /// depend on it.
    pub fn load(project_root: impl Into<PathBuf>) -> Result<Self> {
        let project_root = project_root.into();
        let config_file = project_root.join(CONFIG_FILE);

        if !config_file.exists() {
            debug!("No {} found in {}", CONFIG_FILE, project_root.display());
            return Ok(Self::empty(project_root));
        }

        let document = match fs::read_to_string(&config_file) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Could not parse {}: {}", config_file.display(), e);
                    Value::Null
                }
            },
            Err(e) => {
                warn!("Could not read {}: {}", config_file.display(), e);
                Value::Null
            }
        };

        Ok(Self {
            project_root,
            document,
        })
    }

    /// Creates an empty configuration rooted at the given directory.
    pub fn empty(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            document: Value::Null,
        }
    }

    /// Returns the project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Returns the workflows directory.
    pub fn workflows_dir(&self) -> PathBuf {
        self.project_root.join(WORKFLOWS_DIR)
    }

    /// Flattens the configuration into workflow variables.
    ///
    /// Nested keys are joined with `_` and uppercased; scalar values
    /// are stringified; sequences and nulls are skipped. Adds the
    /// convenience aliases `FORK_ORG` and `BRANCH_NAME` plus computed
    /// project paths.
    pub fn variables(&self) -> VariableMap {
        let mut vars = VariableMap::new();
        flatten(&self.document, "", &mut vars);

        // Convenience aliases for the most commonly referenced keys
        if let Some(org) = vars.get("GITHUB_FORK_ORG").cloned() {
            vars.insert("FORK_ORG".to_string(), org);
        }
        if let Some(branch) = vars.get("GITHUB_BRANCH_NAME").cloned() {
            vars.insert("BRANCH_NAME".to_string(), branch);
        }

        // Computed project-relative paths
        vars.insert(
            "PROJECT_ROOT".to_string(),
            self.project_root.display().to_string(),
        );
        vars.insert(
            "WORKFLOWS_DIR".to_string(),
            self.workflows_dir().display().to_string(),
        );
        vars.insert(
            "LOCAL_CHECKOUTS_DIR".to_string(),
            self.project_root.join("src").display().to_string(),
        );

        vars
    }
}

fn flatten(value: &Value, prefix: &str, out: &mut VariableMap) {
    let Value::Mapping(mapping) = value else {
        return;
    };

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        let name = if prefix.is_empty() {
            key.to_uppercase()
        } else {
            format!("{}_{}", prefix, key.to_uppercase())
        };

        match value {
            Value::Mapping(_) => flatten(value, &name, out),
            Value::String(s) => {
                out.insert(name, s.clone());
            }
            Value::Bool(b) => {
                out.insert(name, b.to_string());
            }
            Value::Number(n) => {
                out.insert(name, n.to_string());
            }
            // Sequences and nulls have no scalar representation
            _ => {}
        }
    }
}
