//! Error Taxonomy
//!
//! All failures surfaced by the engine. Resolution-phase errors
//! (`NotFound`, `Validation`, `CircularInclude`, `MissingVariable`)
//! are produced before any external command runs, so they guarantee
//! zero side effects.

use thiserror::Error;

/// Errors produced during workflow resolution and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced workflow name has no definition file.
    #[error("workflow '{name}' not found (searched {path})")]
    NotFound { name: String, path: String },

    /// A definition file exists but is malformed.
    #[error("invalid workflow '{workflow}': {message}")]
    Validation { workflow: String, message: String },

    /// The include graph contains a cycle.
    #[error("circular include detected: {cycle}")]
    CircularInclude { cycle: String },

    /// A step argument references a placeholder absent from the
    /// final merged variable layer.
    #[error("step '{step}' references undefined variable '{placeholder}'")]
    MissingVariable { step: String, placeholder: String },

    /// A dispatched step exited with a failure status.
    #[error("step '{step}' (#{position}) failed: {status}")]
    StepFailed {
        step: String,
        position: usize,
        status: String,
    },

    /// Nested workflow execution exceeded the depth limit.
    #[error("nested workflow '{workflow}' exceeds maximum depth of {depth}")]
    RecursionLimit { workflow: String, depth: usize },

    /// Underlying I/O failure (definition directory unreadable, etc.).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a validation error for a named workflow.
    pub fn validation(workflow: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            workflow: workflow.into(),
            message: message.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound {
            name: "deploy".to_string(),
            path: "/tmp/workflows".to_string(),
        };
        assert!(err.to_string().contains("deploy"));
        assert!(err.to_string().contains("/tmp/workflows"));
    }

    #[test]
    fn test_circular_include_display() {
        let err = Error::CircularInclude {
            cycle: "a -> b -> a".to_string(),
        };
        assert_eq!(err.to_string(), "circular include detected: a -> b -> a");
    }

    #[test]
    fn test_missing_variable_display() {
        let err = Error::MissingVariable {
            step: "tag image".to_string(),
            placeholder: "REGISTRY_TAG".to_string(),
        };
        assert!(err.to_string().contains("tag image"));
        assert!(err.to_string().contains("REGISTRY_TAG"));
    }

    #[test]
    fn test_validation_helper() {
        let err = Error::validation("deploy", "step 2 has an empty command");
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("deploy"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
