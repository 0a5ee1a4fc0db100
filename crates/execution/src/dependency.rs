//! Dependency graph construction and validation.

use crate::error::GraphError;
use keel_core::TargetNode;
use std::collections::HashMap;
use tracing::debug;

/// A validated, acyclic graph of build targets.
///
/// Targets keep their declaration order; every index handed out by the
/// graph refers to that order. The graph is read-only once built.
#[derive(Debug)]
pub struct DependencyGraph {
    /// All targets, in declaration order
    nodes: Vec<TargetNode>,
    /// name -> index
    index: HashMap<String, usize>,
    /// target -> [dependencies]
    graph: Vec<Vec<usize>>,
    /// target -> [dependents]
    reverse: Vec<Vec<usize>>,
    /// Index of the default target
    default_target: usize,
}

impl DependencyGraph {
    /// Build a graph from targets and the name of the default target.
    ///
    /// Checks, in order: duplicate names, unresolved dependencies, cycles,
    /// and an unresolved default target.
    pub fn build(nodes: Vec<TargetNode>, default_target: &str) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.name().to_string(), i).is_some() {
                return Err(GraphError::DuplicateNode(node.name().to_string()));
            }
        }

        let mut graph = Vec::with_capacity(nodes.len());
        let mut reverse = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            let mut deps = Vec::with_capacity(node.dependencies().len());
            for dep in node.dependencies() {
                let Some(&d) = index.get(dep) else {
                    return Err(GraphError::UnknownDependency {
                        target: node.name().to_string(),
                        dependency: dep.clone(),
                    });
                };
                deps.push(d);
                reverse[d].push(i);
            }
            graph.push(deps);
        }

        if let Some(cycle) = find_cycle(&graph) {
            return Err(GraphError::Cycle {
                path: cycle
                    .into_iter()
                    .map(|i| nodes[i].name().to_string())
                    .collect(),
            });
        }

        let default_target = index
            .get(default_target)
            .copied()
            .ok_or_else(|| GraphError::UnknownDefaultTarget(default_target.to_string()))?;

        debug!(
            targets = nodes.len(),
            default = nodes[default_target].name(),
            "Built dependency graph"
        );

        Ok(Self {
            nodes,
            index,
            graph,
            reverse,
            default_target,
        })
    }

    /// All targets in declaration order.
    pub fn nodes(&self) -> &[TargetNode] {
        &self.nodes
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Option<&TargetNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Whether a target with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The default target.
    pub fn default_target(&self) -> &TargetNode {
        &self.nodes[self.default_target]
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no targets.
    ///
    /// Always false for a built graph, since the default target must exist.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of the targets that depend directly on `name`, in declaration order.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.index_of(name)
            .map(|i| {
                self.reverse[i]
                    .iter()
                    .map(|&d| self.nodes[d].name())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn default_index(&self) -> usize {
        self.default_target
    }

    pub(crate) fn node(&self, index: usize) -> &TargetNode {
        &self.nodes[index]
    }

    pub(crate) fn dependencies_of(&self, index: usize) -> &[usize] {
        &self.graph[index]
    }

    pub(crate) fn dependents_of(&self, index: usize) -> &[usize] {
        &self.reverse[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first search for a cycle, visiting targets and edges in
/// declaration order. Returns the loop starting at the target that closes it.
fn find_cycle(graph: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut stack = Vec::new();

    (0..graph.len()).find_map(|start| {
        if marks[start] == Mark::Unvisited {
            visit(start, graph, &mut marks, &mut stack).err()
        } else {
            None
        }
    })
}

fn visit(
    node: usize,
    graph: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Result<(), Vec<usize>> {
    marks[node] = Mark::InProgress;
    stack.push(node);

    for &dep in &graph[node] {
        match marks[dep] {
            Mark::InProgress => {
                let start = stack.iter().position(|&n| n == dep).unwrap_or(0);
                return Err(stack[start..].to_vec());
            }
            Mark::Unvisited => visit(dep, graph, marks, stack)?,
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[node] = Mark::Done;
    Ok(())
}
