//! Target selection - resolve requested names to their dependency closure.

use crate::dependency::DependencyGraph;
use crate::error::SelectionError;
use keel_core::TargetNode;
use std::collections::BTreeSet;
use tracing::debug;

/// A set of targets closed under the dependency relation.
///
/// Members are kept as declaration indices, so iteration follows
/// declaration order.
#[derive(Debug, Clone)]
pub struct Selection<'g> {
    graph: &'g DependencyGraph,
    members: BTreeSet<usize>,
}

impl<'g> Selection<'g> {
    /// The graph this selection was taken from.
    pub fn graph(&self) -> &'g DependencyGraph {
        self.graph
    }

    /// Number of selected targets.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether a target is selected.
    pub fn contains(&self, name: &str) -> bool {
        self.graph
            .index_of(name)
            .is_some_and(|i| self.members.contains(&i))
    }

    /// Selected targets in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &'g TargetNode> + '_ {
        let graph = self.graph;
        self.members.iter().map(move |&i| graph.node(i))
    }

    /// Names of the selected targets in declaration order.
    pub fn names(&self) -> Vec<&'g str> {
        self.nodes().map(TargetNode::name).collect()
    }

    pub(crate) fn indices(&self) -> &BTreeSet<usize> {
        &self.members
    }

    pub(crate) fn contains_index(&self, index: usize) -> bool {
        self.members.contains(&index)
    }
}

/// Resolves requested target names into a dependency-closed selection.
pub struct TargetSelector;

impl TargetSelector {
    /// Create a new selector.
    pub fn new() -> Self {
        Self
    }

    /// Select the requested targets and everything they transitively depend on.
    ///
    /// An empty request selects the default target. Every unknown name is
    /// reported, not just the first.
    pub fn select<'g>(
        &self,
        graph: &'g DependencyGraph,
        requested: &[&str],
    ) -> Result<Selection<'g>, SelectionError> {
        let roots: Vec<usize> = if requested.is_empty() {
            vec![graph.default_index()]
        } else {
            let mut roots = Vec::with_capacity(requested.len());
            let mut unknown: Vec<String> = Vec::new();
            for name in requested {
                match graph.index_of(name) {
                    Some(i) => roots.push(i),
                    None if !unknown.iter().any(|u| u == name) => unknown.push(name.to_string()),
                    None => {}
                }
            }
            if !unknown.is_empty() {
                return Err(SelectionError::UnknownTargets(unknown));
            }
            roots
        };

        let mut members = BTreeSet::new();
        let mut stack = roots;
        while let Some(i) = stack.pop() {
            if members.insert(i) {
                stack.extend(graph.dependencies_of(i).iter().copied());
            }
        }

        debug!(
            requested = ?requested,
            selected = members.len(),
            "Resolved target selection"
        );

        Ok(Selection { graph, members })
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, deps: &[&str]) -> TargetNode {
        TargetNode::builder(name).depends_on_all(deps.iter().copied()).build()
    }

    fn build_graph() -> DependencyGraph {
        DependencyGraph::build(
            vec![
                target("compile", &[]),
                target("test", &["compile"]),
                target("package", &["test"]),
                target("lint", &[]),
                target("docs", &["compile"]),
            ],
            "package",
        )
        .unwrap()
    }

    fn assert_closed(selection: &Selection<'_>) {
        for node in selection.nodes() {
            for dep in node.dependencies() {
                assert!(
                    selection.contains(dep),
                    "{} selected without its dependency {}",
                    node.name(),
                    dep
                );
            }
        }
    }

    #[test]
    fn test_empty_request_selects_default_closure() {
        let graph = build_graph();
        let selection = TargetSelector::new().select(&graph, &[]).unwrap();

        assert_eq!(selection.names(), vec!["compile", "test", "package"]);
        assert!(!selection.contains("lint"));
        assert_closed(&selection);
    }

    #[test]
    fn test_union_of_requested_closures() {
        let graph = build_graph();
        let selection = TargetSelector::new()
            .select(&graph, &["docs", "lint"])
            .unwrap();

        assert_eq!(selection.names(), vec!["compile", "lint", "docs"]);
        assert_closed(&selection);
    }

    #[test]
    fn test_requesting_a_leaf_selects_only_it() {
        let graph = build_graph();
        let selection = TargetSelector::new().select(&graph, &["lint"]).unwrap();

        assert_eq!(selection.len(), 1);
        assert!(selection.contains("lint"));
    }

    #[test]
    fn test_every_request_combination_is_closed() {
        let graph = build_graph();
        let names = ["compile", "test", "package", "lint", "docs"];
        let selector = TargetSelector::new();

        for mask in 0u32..(1 << names.len()) {
            let requested: Vec<&str> = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << *i) != 0)
                .map(|(_, n)| *n)
                .collect();
            let selection = selector.select(&graph, &requested).unwrap();
            assert_closed(&selection);
            for name in &requested {
                assert!(selection.contains(name));
            }
        }
    }

    #[test]
    fn test_all_unknown_names_reported() {
        let graph = build_graph();
        let err = TargetSelector::new()
            .select(&graph, &["deploy", "test", "publish", "deploy"])
            .unwrap_err();

        assert_eq!(
            err,
            SelectionError::UnknownTargets(vec!["deploy".to_string(), "publish".to_string()])
        );
    }

    #[test]
    fn test_duplicate_requests_are_harmless() {
        let graph = build_graph();
        let selection = TargetSelector::new()
            .select(&graph, &["test", "test"])
            .unwrap();

        assert_eq!(selection.names(), vec!["compile", "test"]);
    }
}
