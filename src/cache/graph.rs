//! Model-level dependency graph.
//!
//! Records are declared in per-model blocks, so ordering happens between
//! models: an edge `from → to` means some record of `from` references a
//! record of `to`, and `to`'s block must be declared first. The graph
//! provides cycle detection and a topological order whose ties are broken by
//! a caller-supplied rank.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::core::FixtureError;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Directed graph of model ids.
#[derive(Debug, Default)]
pub struct ModelGraph {
    /// The underlying directed graph.
    graph: DiGraph<String, ()>,
    /// Map from model ids to their graph indices.
    node_map: HashMap<String, NodeIndex>,
}

impl ModelGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph if it doesn't already exist.
    fn ensure_node(&mut self, model_id: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(model_id) {
            index
        } else {
            let index = self.graph.add_node(model_id.to_string());
            self.node_map.insert(model_id.to_string(), index);
            index
        }
    }

    /// Register a model with no dependencies yet.
    pub fn add_model(&mut self, model_id: &str) {
        self.ensure_node(model_id);
    }

    /// Record that `from` references `to`.
    ///
    /// Self references are ignored: records of one model share a block, and
    /// the discovery walk already rejects record-level cycles.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if from_idx != to_idx && !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Direct dependencies of a model, in edge insertion order.
    pub fn dependencies(&self, model_id: &str) -> Vec<String> {
        let Some(&idx) = self.node_map.get(model_id) else {
            return Vec::new();
        };
        let mut deps: Vec<String> =
            self.graph.neighbors(idx).map(|n| self.graph[n].clone()).collect();
        // petgraph yields neighbors newest-first
        deps.reverse();
        deps
    }

    /// Detect cycles using DFS with colors.
    pub fn detect_cycles(&self) -> Result<(), FixtureError> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                let chain = cycle
                    .iter()
                    .map(|idx| self.graph[*idx].as_str())
                    .collect::<Vec<_>>()
                    .join(" → ");
                return Err(FixtureError::CircularDependency {
                    chain,
                });
            }
        }

        Ok(())
    }

    /// DFS visit for cycle detection; returns the cycle path if one is found.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Topological order, dependencies first.
    ///
    /// Among models whose dependencies are all placed, the one with the
    /// lowest `rank` goes next; models without a rank go last, by name.
    /// Only models accepted by `include` appear in the result.
    pub fn ordered(
        &self,
        rank: &HashMap<&str, usize>,
        include: impl Fn(&str) -> bool,
    ) -> Result<Vec<String>, FixtureError> {
        let key_of = |idx: NodeIndex| {
            let name = self.graph[idx].as_str();
            (rank.get(name).copied().unwrap_or(usize::MAX), name)
        };

        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(usize, &str, NodeIndex)>> = BinaryHeap::new();
        for (&node, &count) in &pending {
            if count == 0 {
                let (r, name) = key_of(node);
                ready.push(Reverse((r, name, node)));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, name, node))) = ready.pop() {
            order.push(name.to_string());
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        let (r, dep_name) = key_of(dependent);
                        ready.push(Reverse((r, dep_name, dependent)));
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            self.detect_cycles()?;
            return Err(FixtureError::CircularDependency {
                chain: "unresolvable model order".to_string(),
            });
        }

        order.retain(|model| include(model));
        Ok(order)
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of models in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependency edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
