//! Scheduling - turn a selection into a deterministic execution plan.

use crate::dependency::DependencyGraph;
use crate::selector::Selection;
use keel_core::TargetNode;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

/// An ordered run over a selection, borrowed from its graph.
///
/// Every target appears after all of its dependencies.
#[derive(Debug, Clone)]
pub struct ExecutionPlan<'g> {
    graph: &'g DependencyGraph,
    order: Vec<usize>,
}

impl<'g> ExecutionPlan<'g> {
    /// The graph the plan was built from.
    pub fn graph(&self) -> &'g DependencyGraph {
        self.graph
    }

    /// Number of targets in the plan.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Targets in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &'g TargetNode> + '_ {
        let graph = self.graph;
        self.order.iter().map(move |&i| graph.node(i))
    }

    /// Target names in execution order.
    pub fn names(&self) -> Vec<&'g str> {
        self.iter().map(TargetNode::name).collect()
    }

    /// Position of a target in the plan.
    pub fn position(&self, name: &str) -> Option<usize> {
        let index = self.graph.index_of(name)?;
        self.order.iter().position(|&i| i == index)
    }

    pub(crate) fn indices(&self) -> &[usize] {
        &self.order
    }
}

/// Orders selected targets topologically.
///
/// Among targets whose dependencies are all scheduled, the one declared
/// first goes next. The same inputs always produce the same plan.
pub struct Scheduler;

impl Scheduler {
    /// Create a new scheduler.
    pub fn new() -> Self {
        Self
    }

    /// Order a selection into an execution plan.
    pub fn order<'g>(&self, selection: &Selection<'g>) -> ExecutionPlan<'g> {
        let graph = selection.graph();

        // Unscheduled dependency count per selected target, indexed by declaration order.
        let mut pending: Vec<Option<usize>> = vec![None; graph.len()];
        let mut ready = BinaryHeap::new();

        for &i in selection.indices() {
            let count = graph
                .dependencies_of(i)
                .iter()
                .filter(|&&d| selection.contains_index(d))
                .count();
            pending[i] = Some(count);
            if count == 0 {
                ready.push(Reverse(i));
            }
        }

        let mut order = Vec::with_capacity(selection.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &dependent in graph.dependents_of(i) {
                if let Some(count) = pending[dependent].as_mut() {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        debug_assert_eq!(order.len(), selection.len(), "graph is acyclic");

        let plan = ExecutionPlan { graph, order };
        debug!(plan = ?plan.names(), "Scheduled execution plan");
        plan
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::TargetSelector;

    fn target(name: &str, deps: &[&str]) -> TargetNode {
        TargetNode::builder(name).depends_on_all(deps.iter().copied()).build()
    }

    fn plan_names(graph: &DependencyGraph, requested: &[&str]) -> Vec<String> {
        let selection = TargetSelector::new().select(graph, requested).unwrap();
        Scheduler::new()
            .order(&selection)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn assert_valid(graph: &DependencyGraph, plan: &ExecutionPlan<'_>) {
        for node in plan.iter() {
            let pos = plan.position(node.name()).unwrap();
            for dep in node.dependencies() {
                let dep_pos = plan.position(dep).expect("dependency in plan");
                assert!(dep_pos < pos, "{} scheduled before {}", node.name(), dep);
            }
        }
        assert!(plan.len() <= graph.len());
    }

    #[test]
    fn test_default_plan_order() {
        let graph = DependencyGraph::build(
            vec![
                target("compile", &[]),
                target("test", &["compile"]),
                target("package", &["test"]),
                target("lint", &[]),
            ],
            "package",
        )
        .unwrap();

        assert_eq!(plan_names(&graph, &[]), vec!["compile", "test", "package"]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let graph = DependencyGraph::build(
            vec![
                target("zeta", &[]),
                target("alpha", &[]),
                target("mid", &[]),
                target("all", &["mid", "alpha", "zeta"]),
            ],
            "all",
        )
        .unwrap();

        assert_eq!(plan_names(&graph, &[]), vec!["zeta", "alpha", "mid", "all"]);
    }

    #[test]
    fn test_dependency_declared_after_dependent() {
        let graph = DependencyGraph::build(
            vec![
                target("publish", &["pack"]),
                target("docs", &[]),
                target("pack", &["restore"]),
                target("restore", &[]),
            ],
            "publish",
        )
        .unwrap();

        assert_eq!(
            plan_names(&graph, &["publish", "docs"]),
            vec!["docs", "restore", "pack", "publish"]
        );
    }

    #[test]
    fn test_plan_is_valid_for_diamond() {
        let graph = DependencyGraph::build(
            vec![
                target("top", &["left", "right"]),
                target("right", &["base"]),
                target("left", &["base"]),
                target("base", &[]),
            ],
            "top",
        )
        .unwrap();

        let selection = TargetSelector::new().select(&graph, &[]).unwrap();
        let plan = Scheduler::new().order(&selection);

        assert_valid(&graph, &plan);
        assert_eq!(plan.names(), vec!["base", "right", "left", "top"]);
    }

    #[test]
    fn test_repeated_scheduling_is_identical() {
        let graph = DependencyGraph::build(
            vec![
                target("a", &[]),
                target("b", &["a"]),
                target("c", &[]),
                target("d", &["c", "a"]),
                target("e", &["b", "d"]),
                target("f", &[]),
            ],
            "e",
        )
        .unwrap();

        let first = plan_names(&graph, &["e", "f"]);
        for _ in 0..20 {
            assert_eq!(plan_names(&graph, &["e", "f"]), first);
        }
        assert_eq!(first, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_plan_excludes_unselected_targets() {
        let graph = DependencyGraph::build(
            vec![target("compile", &[]), target("lint", &[])],
            "compile",
        )
        .unwrap();

        let selection = TargetSelector::new().select(&graph, &[]).unwrap();
        let plan = Scheduler::new().order(&selection);

        assert_eq!(plan.len(), 1);
        assert!(plan.position("lint").is_none());
    }
}
