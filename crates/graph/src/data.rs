use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Graph, NodeId};

/// One undirected edge in the transfer form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Plain serialized graph snapshot consumed by every algorithm function.
///
/// Safe to copy across the worker isolation boundary: no behavior, no
/// references back into the caller's [`Graph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeData>,
    #[serde(default)]
    pub adjacency: IndexMap<NodeId, Vec<NodeId>>,
}

impl GraphData {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Neighbor list for a node (empty slice when unknown).
    pub fn neighbors(&self, id: &str) -> &[NodeId] {
        self.adjacency.get(id).map_or(&[], |nbrs| nbrs.as_slice())
    }

    /// Reconstruct a live [`Graph`] from the snapshot.
    ///
    /// Self-loops present in the data are preserved, so the rebuilt
    /// graph always permits them.
    pub fn into_graph(self) -> Graph {
        let mut graph = Graph::with_self_loops();
        graph.add_nodes_from(self.nodes);
        for edge in self.edges {
            // add_weighted_edge cannot fail on a self-loop-permitting graph
            let _ = graph.add_weighted_edge(edge.source, edge.target, edge.weight);
        }
        graph
    }
}

impl From<&Graph> for GraphData {
    fn from(graph: &Graph) -> Self {
        graph.to_data()
    }
}
