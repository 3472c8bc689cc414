//! Include Resolver
//!
//! Expands a workflow's `includes` list into an ordered, deduplicated
//! sequence of definitions via depth-first traversal, rejecting
//! cycles before anything executes.
//!
//! The output order is dependency-first: a workflow's own includes
//! always appear before it, so flattening the resulting list keeps
//! included steps ahead of the steps that include them.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};

use super::model::WorkflowDefinition;
use super::repository::Repository;

/// Resolves the root's direct and transitive includes.
///
/// Returns each included definition exactly once, in post-order
/// depth-first (left-to-right) traversal order. The root itself is
/// not part of the result. A workflow reachable through two paths
/// is expanded only at its first encounter.
///
/// Fails with `CircularInclude` naming the full cycle chain if the
/// include graph is cyclic, and propagates `NotFound`/`Validation`
/// from loading the included definitions.
pub fn resolve(
    repository: &mut Repository,
    root: &WorkflowDefinition,
) -> Result<Vec<Arc<WorkflowDefinition>>> {
    let mut resolver = Resolver {
        repository,
        visiting: vec![root.name.clone()],
        resolved: HashSet::new(),
        order: Vec::new(),
    };

    for include in &root.includes {
        resolver.visit(include)?;
    }

    debug!(
        "Resolved includes for '{}': {:?}",
        root.name,
        resolver.order.iter().map(|d| &d.name).collect::<Vec<_>>()
    );

    Ok(resolver.order)
}

struct Resolver<'a> {
    repository: &'a mut Repository,
    /// Ancestors on the current traversal path, root first.
    visiting: Vec<String>,
    /// Names already fully expanded.
    resolved: HashSet<String>,
    /// Output sequence, dependency-first.
    order: Vec<Arc<WorkflowDefinition>>,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &str) -> Result<()> {
        if self.visiting.iter().any(|n| n == name) {
            let mut chain = self.visiting.clone();
            chain.push(name.to_string());
            return Err(Error::CircularInclude {
                cycle: chain.join(" -> "),
            });
        }

        if self.resolved.contains(name) {
            // Already expanded earlier in the traversal; keep the
            // first-seen position.
            return Ok(());
        }

        let definition = self.repository.load(name)?;

        self.visiting.push(name.to_string());
        for include in &definition.includes {
            self.visit(include)?;
        }
        self.visiting.pop();

        self.resolved.insert(name.to_string());
        self.order.push(definition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_workflow(dir: &Path, name: &str, yaml: &str) {
        fs::write(dir.join(format!("{}.yaml", name)), yaml).unwrap();
    }

    fn resolve_names(dir: &Path, root: &str) -> Result<Vec<String>> {
        let mut repo = Repository::new(dir);
        let root = repo.load(root)?;
        let resolved = resolve(&mut repo, &root)?;
        Ok(resolved.iter().map(|d| d.name.clone()).collect())
    }

    #[test]
    fn test_no_includes() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "solo", "name: solo\n");

        assert!(resolve_names(temp.path(), "solo").unwrap().is_empty());
    }

    #[test]
    fn test_linear_chain_dependency_first() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "a", "name: a\n");
        write_workflow(temp.path(), "b", "name: b\nincludes: [a]\n");
        write_workflow(temp.path(), "c", "name: c\nincludes: [b]\n");

        assert_eq!(resolve_names(temp.path(), "c").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_diamond_expanded_once() {
        // m -> [a, b], b -> [a]: a appears once, before b
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "a", "name: a\n");
        write_workflow(temp.path(), "b", "name: b\nincludes: [a]\n");
        write_workflow(temp.path(), "m", "name: m\nincludes: [a, b]\n");

        assert_eq!(resolve_names(temp.path(), "m").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_left_to_right_order() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "x", "name: x\n");
        write_workflow(temp.path(), "y", "name: y\n");
        write_workflow(temp.path(), "m", "name: m\nincludes: [y, x]\n");

        assert_eq!(resolve_names(temp.path(), "m").unwrap(), vec!["y", "x"]);
    }

    #[test]
    fn test_every_workflow_after_its_own_includes() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "base", "name: base\n");
        write_workflow(temp.path(), "mid1", "name: mid1\nincludes: [base]\n");
        write_workflow(temp.path(), "mid2", "name: mid2\nincludes: [base, mid1]\n");
        write_workflow(temp.path(), "top", "name: top\nincludes: [mid2, mid1]\n");

        let order = resolve_names(temp.path(), "top").unwrap();
        assert_eq!(order, vec!["base", "mid1", "mid2"]);

        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("base") < pos("mid1"));
        assert!(pos("mid1") < pos("mid2"));
    }

    #[test]
    fn test_two_node_cycle_names_chain() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "a", "name: a\nincludes: [b]\n");
        write_workflow(temp.path(), "b", "name: b\nincludes: [a]\n");

        let err = resolve_names(temp.path(), "a").unwrap_err();
        match err {
            Error::CircularInclude { cycle } => assert_eq!(cycle, "a -> b -> a"),
            other => panic!("expected CircularInclude, got {:?}", other),
        }
    }

    #[test]
    fn test_three_node_cycle_names_full_chain() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "a", "name: a\nincludes: [b]\n");
        write_workflow(temp.path(), "b", "name: b\nincludes: [c]\n");
        write_workflow(temp.path(), "c", "name: c\nincludes: [a]\n");

        let err = resolve_names(temp.path(), "a").unwrap_err();
        assert_eq!(err.to_string(), "circular include detected: a -> b -> c -> a");
    }

    #[test]
    fn test_self_include_rejected() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "loop", "name: loop\nincludes: [loop]\n");

        let err = resolve_names(temp.path(), "loop").unwrap_err();
        assert!(err.to_string().contains("loop -> loop"));
    }

    #[test]
    fn test_missing_include_propagates_not_found() {
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "m", "name: m\nincludes: [ghost]\n");

        let err = resolve_names(temp.path(), "m").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_shared_include_not_a_cycle() {
        // Reaching the same workflow via two sibling paths is fine
        let temp = tempdir().unwrap();
        write_workflow(temp.path(), "common", "name: common\n");
        write_workflow(temp.path(), "left", "name: left\nincludes: [common]\n");
        write_workflow(temp.path(), "right", "name: right\nincludes: [common]\n");
        write_workflow(temp.path(), "top", "name: top\nincludes: [left, right]\n");

        assert_eq!(
            resolve_names(temp.path(), "top").unwrap(),
            vec!["common", "left", "right"]
        );
    }
}
