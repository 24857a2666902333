//! Whole-graph statistics, registered as the `graph_stats` module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::error::ComputeError;

use super::{graph_arg, node_stats, to_result, Indexed};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_degree: f64,
    pub connected_components: usize,
    pub average_clustering: f64,
}

/// One-shot summary of the graph's global shape.
pub fn summary(data: &GraphData, progress: &dyn Fn(f64)) -> GraphSummary {
    let n = data.node_count();
    let m = data.edge_count();

    let density = if n > 1 {
        2.0 * m as f64 / (n as f64 * (n - 1) as f64)
    } else {
        0.0
    };
    let average_degree = if n > 0 { 2.0 * m as f64 / n as f64 } else { 0.0 };
    progress(0.2);

    let (_, component_count) = component_labels(data);
    progress(0.6);

    let clustering = node_stats::clustering(data, &|_| {});
    let average_clustering = if n > 0 {
        clustering.values().sum::<f64>() / n as f64
    } else {
        0.0
    };

    progress(1.0);
    GraphSummary {
        node_count: n,
        edge_count: m,
        density,
        average_degree,
        connected_components: component_count,
        average_clustering,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
    /// Node id -> component label (0-based, in discovery order).
    pub components: HashMap<NodeId, u64>,
    pub count: usize,
}

/// Connected-component labeling by repeated BFS.
pub fn components(data: &GraphData, progress: &dyn Fn(f64)) -> ComponentResult {
    let (components, count) = component_labels(data);
    progress(1.0);
    ComponentResult { components, count }
}

fn component_labels(data: &GraphData) -> (HashMap<NodeId, u64>, usize) {
    let idx = Indexed::new(data);
    let n = idx.len();
    let mut label = vec![None::<u64>; n];
    let mut next_label = 0u64;

    for start in 0..n {
        if label[start].is_some() {
            continue;
        }
        let mut queue = vec![start];
        label[start] = Some(next_label);
        while let Some(v) = queue.pop() {
            for &w in &idx.adj[v] {
                if label[w].is_none() {
                    label[w] = Some(next_label);
                    queue.push(w);
                }
            }
        }
        next_label += 1;
    }

    let map = idx
        .nodes
        .iter()
        .enumerate()
        .map(|(i, &id)| (id.to_string(), label[i].unwrap_or(0)))
        .collect();
    (map, next_label as usize)
}

// ── Registry entry points ────────────────────────────────────────────

pub(crate) fn summary_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    to_result(summary(&data, progress))
}

pub(crate) fn components_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    to_result(components(&data, progress))
}
