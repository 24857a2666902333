use indexmap::IndexMap;
use thiserror::Error;

use crate::data::{EdgeData, GraphData};

/// Caller-supplied node identifier.
pub type NodeId = String;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("self-loop on '{0}' rejected (enable with Graph::with_self_loops)")]
    SelfLoop(String),
}

/// Weighted undirected graph over an insertion-ordered adjacency map.
///
/// Invariants: at most one edge per unordered node pair (re-adding
/// overwrites the weight), self-loops only when explicitly enabled,
/// edge weight defaults to 1.0.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    adjacency: IndexMap<NodeId, IndexMap<NodeId, f64>>,
    edge_count: usize,
    allow_self_loops: bool,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph that accepts explicitly added self-loops.
    pub fn with_self_loops() -> Self {
        Self {
            allow_self_loops: true,
            ..Self::default()
        }
    }

    /// Add a node. Idempotent: re-adding an existing id is a no-op.
    pub fn add_node(&mut self, id: impl Into<NodeId>) {
        self.adjacency.entry(id.into()).or_default();
    }

    /// Add every node in the iterator.
    pub fn add_nodes_from<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        for id in ids {
            self.add_node(id);
        }
    }

    /// Add an undirected edge with weight 1.0.
    pub fn add_edge(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Result<(), GraphError> {
        self.add_weighted_edge(source, target, 1.0)
    }

    /// Add an undirected edge, creating missing endpoints. A duplicate
    /// edge (either direction) overwrites the stored weight.
    pub fn add_weighted_edge(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        weight: f64,
    ) -> Result<(), GraphError> {
        let source = source.into();
        let target = target.into();

        if source == target {
            if !self.allow_self_loops {
                return Err(GraphError::SelfLoop(source));
            }
            self.add_node(source.clone());
            let existed = self
                .adjacency
                .get_mut(&source)
                .and_then(|nbrs| nbrs.insert(target, weight))
                .is_some();
            if !existed {
                self.edge_count += 1;
            }
            return Ok(());
        }

        self.add_node(source.clone());
        self.add_node(target.clone());

        let existed = self
            .adjacency
            .get_mut(&source)
            .and_then(|nbrs| nbrs.insert(target.clone(), weight))
            .is_some();
        if let Some(nbrs) = self.adjacency.get_mut(&target) {
            nbrs.insert(source, weight);
        }

        if !existed {
            self.edge_count += 1;
        }
        Ok(())
    }

    /// Remove a node and every edge touching it. Returns whether the
    /// node was present.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(neighbors) = self.adjacency.shift_remove(id) else {
            return false;
        };

        for neighbor in neighbors.keys() {
            if neighbor == id {
                // self-loop counted once
                self.edge_count -= 1;
                continue;
            }
            if let Some(nbrs) = self.adjacency.get_mut(neighbor) {
                if nbrs.shift_remove(id).is_some() {
                    self.edge_count -= 1;
                }
            }
        }
        true
    }

    /// Remove the edge between two nodes. Returns whether it existed.
    pub fn remove_edge(&mut self, a: &str, b: &str) -> bool {
        let removed = self
            .adjacency
            .get_mut(a)
            .and_then(|nbrs| nbrs.shift_remove(b))
            .is_some();
        if a != b {
            if let Some(nbrs) = self.adjacency.get_mut(b) {
                nbrs.shift_remove(a);
            }
        }
        if removed {
            self.edge_count -= 1;
        }
        removed
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.adjacency.contains_key(id)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency.get(a).is_some_and(|nbrs| nbrs.contains_key(b))
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        self.adjacency.get(a).and_then(|nbrs| nbrs.get(b)).copied()
    }

    /// O(1) neighbor lookup.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &NodeId> + '_ {
        self.adjacency.get(id).into_iter().flat_map(|nbrs| nbrs.keys())
    }

    pub fn degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map_or(0, |nbrs| nbrs.len())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.adjacency.keys()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Serialize to the transfer form copied across the worker boundary.
    ///
    /// Each unordered pair appears once in `edges`, oriented from the
    /// earlier-inserted node; `adjacency` lists neighbors per node.
    pub fn to_data(&self) -> GraphData {
        let nodes: Vec<NodeId> = self.adjacency.keys().cloned().collect();

        let mut edges = Vec::with_capacity(self.edge_count);
        for (source, nbrs) in &self.adjacency {
            for (target, &weight) in nbrs {
                // Emit each pair once: when the target comes later in
                // insertion order, or for self-loops.
                let src_idx = self.adjacency.get_index_of(source.as_str());
                let tgt_idx = self.adjacency.get_index_of(target.as_str());
                if src_idx <= tgt_idx {
                    edges.push(EdgeData {
                        source: source.clone(),
                        target: target.clone(),
                        weight,
                    });
                }
            }
        }

        let adjacency = self
            .adjacency
            .iter()
            .map(|(id, nbrs)| (id.clone(), nbrs.keys().cloned().collect()))
            .collect();

        GraphData {
            nodes,
            edges,
            adjacency,
        }
    }
}
