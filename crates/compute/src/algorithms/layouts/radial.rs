use std::f64::consts::{PI, TAU};

use serde::Deserialize;
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::algorithms::{graph_arg, options_arg, to_result, Indexed};
use crate::error::ComputeError;

use super::{Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RadialOptions {
    /// Node placed at the center. Absent or unknown ids fall back to
    /// the highest-degree node.
    pub center_node: Option<NodeId>,
    /// Radius of the outermost ring.
    pub scale: f64,
    pub center: Position,
    /// Angle of the first node in each ring; default points straight up.
    pub start_angle: f64,
    /// Order each ring by descending degree instead of insertion order.
    pub sort_by_degree: bool,
}

impl Default for RadialOptions {
    fn default() -> Self {
        Self {
            center_node: None,
            scale: 1.0,
            center: Position::default(),
            start_angle: -PI / 2.0,
            sort_by_degree: true,
        }
    }
}

/// Concentric rings by BFS distance from a center node.
///
/// Nodes unreachable from the center are gathered into one extra
/// outermost ring so every node gets a position.
pub fn radial(data: &GraphData, options: &RadialOptions, progress: &dyn Fn(f64)) -> Positions {
    let idx = Indexed::new(data);
    let n = idx.len();
    if n == 0 {
        progress(1.0);
        return Positions::new();
    }

    let center_idx = options
        .center_node
        .as_deref()
        .and_then(|id| idx.index.get(id).copied())
        .unwrap_or_else(|| {
            // Highest degree, first-inserted on ties.
            (0..n)
                .max_by_key(|&v| (idx.adj[v].len(), usize::MAX - v))
                .unwrap_or(0)
        });
    progress(0.2);

    // BFS rings from the center.
    let mut visited = vec![false; n];
    let mut rings: Vec<Vec<usize>> = vec![vec![center_idx]];
    visited[center_idx] = true;
    loop {
        let mut next = Vec::new();
        for &v in rings.last().map(Vec::as_slice).unwrap_or(&[]) {
            for &w in &idx.adj[v] {
                if !visited[w] {
                    visited[w] = true;
                    next.push(w);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        rings.push(next);
    }
    progress(0.6);

    let unreachable: Vec<usize> = (0..n).filter(|&v| !visited[v]).collect();
    if !unreachable.is_empty() {
        rings.push(unreachable);
    }

    if options.sort_by_degree {
        for ring in rings.iter_mut().skip(1) {
            ring.sort_by_key(|&v| std::cmp::Reverse(idx.adj[v].len()));
        }
    }
    progress(0.8);

    let outermost = (rings.len() - 1).max(1) as f64;
    let mut positions = Positions::with_capacity(n);
    for (ring_idx, ring) in rings.iter().enumerate() {
        if ring_idx == 0 {
            positions.insert(idx.nodes[center_idx].to_string(), options.center);
            continue;
        }
        let radius = options.scale * ring_idx as f64 / outermost;
        for (i, &v) in ring.iter().enumerate() {
            let theta = options.start_angle + TAU * i as f64 / ring.len() as f64;
            positions.insert(
                idx.nodes[v].to_string(),
                Position::new(
                    radius * theta.cos() + options.center.x,
                    radius * theta.sin() + options.center.y,
                ),
            );
        }
    }

    progress(1.0);
    positions
}

pub(crate) fn radial_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: RadialOptions = options_arg(args)?;
    to_result(radial(&data, &options, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_graph::Graph;

    fn noop(_: f64) {}

    fn star() -> GraphData {
        let mut g = Graph::new();
        for leaf in ["a", "b", "c", "d"] {
            g.add_edge("hub", leaf).unwrap();
        }
        g.to_data()
    }

    #[test]
    fn highest_degree_node_sits_at_center() {
        let positions = radial(&star(), &RadialOptions::default(), &noop);
        assert_eq!(positions["hub"], Position::default());

        for leaf in ["a", "b", "c", "d"] {
            let p = positions[leaf];
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn explicit_center_overrides_degree() {
        let options = RadialOptions {
            center_node: Some("a".to_string()),
            ..Default::default()
        };
        let positions = radial(&star(), &options, &noop);
        assert_eq!(positions["a"], Position::default());
        // hub is one hop out, the other leaves two.
        let hub = positions["hub"];
        let b = positions["b"];
        assert!(hub.x.hypot(hub.y) < b.x.hypot(b.y));
    }

    #[test]
    fn unreachable_nodes_land_on_outermost_ring() {
        let mut g = Graph::new();
        g.add_edge("hub", "a").unwrap();
        g.add_node("island");

        let options = RadialOptions {
            scale: 6.0,
            ..Default::default()
        };
        let positions = radial(&g.to_data(), &options, &noop);
        let p = positions["island"];
        assert!((p.x.hypot(p.y) - 6.0).abs() < 1e-9);
    }
}
