use serde::Deserialize;
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::algorithms::{graph_arg, options_arg, to_result, Indexed};
use crate::error::ComputeError;

use super::{collect_positions, Align, Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DfsOptions {
    /// Traversal root. Absent or unknown ids fall back to the first
    /// node in insertion order.
    pub start_node: Option<NodeId>,
    /// `vertical` grows the tree downward, `horizontal` to the right.
    pub align: Align,
    pub scale: f64,
    pub center: Position,
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
}

impl Default for DfsOptions {
    fn default() -> Self {
        Self {
            start_node: None,
            align: Align::Vertical,
            scale: 1.0,
            center: Position::default(),
            horizontal_spacing: 1.0,
            vertical_spacing: 1.0,
        }
    }
}

/// Nested tree placement from a depth-first traversal.
///
/// Each node is centered over its DFS subtree, with depth mapped to
/// one axis and subtree extent to the other. Nodes unreachable from
/// the start become additional roots laid out side by side.
pub fn dfs(data: &GraphData, options: &DfsOptions, progress: &dyn Fn(f64)) -> Positions {
    let idx = Indexed::new(data);
    let n = idx.len();
    if n == 0 {
        progress(1.0);
        return Positions::new();
    }
    if n == 1 {
        let mut p = Positions::with_capacity(1);
        p.insert(idx.nodes[0].to_string(), options.center);
        progress(1.0);
        return p;
    }

    let start = options
        .start_node
        .as_deref()
        .and_then(|id| idx.index.get(id).copied())
        .unwrap_or(0);
    progress(0.2);

    // DFS forest: the start node's tree first, then one tree per
    // remaining unvisited node in insertion order.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut visited = vec![false; n];
    let mut roots = Vec::new();
    for root in std::iter::once(start).chain(0..n) {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        roots.push(root);
        explore(root, &idx.adj, &mut visited, &mut children);
    }
    progress(0.5);

    // Subtree widths, bottom-up.
    let mut widths = vec![0.0f64; n];
    for &root in &roots {
        subtree_width(&children, &mut widths, options.horizontal_spacing, root);
    }
    progress(0.7);

    let mut coords = vec![(0.0, 0.0); n];
    let mut cursor = 0.0;
    for &root in &roots {
        place(
            &children,
            &widths,
            &mut coords,
            root,
            0,
            cursor,
            options.vertical_spacing,
        );
        cursor += widths[root];
    }
    progress(0.85);

    if options.align == Align::Horizontal {
        for c in coords.iter_mut() {
            *c = (-c.1, c.0);
        }
    }

    let nodes: Vec<NodeId> = idx.nodes.iter().map(|&id| id.to_string()).collect();
    let positions = collect_positions(&nodes, coords, options.scale, options.center);
    progress(1.0);
    positions
}

fn explore(v: usize, adj: &[Vec<usize>], visited: &mut [bool], children: &mut [Vec<usize>]) {
    for i in 0..adj[v].len() {
        let w = adj[v][i];
        if !visited[w] {
            visited[w] = true;
            children[v].push(w);
            explore(w, adj, visited, children);
        }
    }
}

fn subtree_width(children: &[Vec<usize>], widths: &mut [f64], spacing: f64, v: usize) {
    let mut sum = 0.0;
    for i in 0..children[v].len() {
        let c = children[v][i];
        subtree_width(children, widths, spacing, c);
        sum += widths[c];
    }
    widths[v] = sum.max(spacing);
}

fn place(
    children: &[Vec<usize>],
    widths: &[f64],
    coords: &mut [(f64, f64)],
    v: usize,
    depth: usize,
    x0: f64,
    vertical_spacing: f64,
) {
    coords[v] = (x0 + widths[v] / 2.0, -(depth as f64) * vertical_spacing);
    let mut cursor = x0;
    for &c in &children[v] {
        place(children, widths, coords, c, depth + 1, cursor, vertical_spacing);
        cursor += widths[c];
    }
}

pub(crate) fn dfs_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: DfsOptions = options_arg(args)?;
    to_result(dfs(&data, &options, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_graph::Graph;

    fn noop(_: f64) {}

    fn binary_tree() -> GraphData {
        let mut g = Graph::new();
        g.add_edge("root", "l").unwrap();
        g.add_edge("root", "r").unwrap();
        g.add_edge("l", "ll").unwrap();
        g.add_edge("r", "rr").unwrap();
        g.to_data()
    }

    #[test]
    fn children_sit_below_their_parent() {
        let options = DfsOptions {
            start_node: Some("root".to_string()),
            ..Default::default()
        };
        let positions = dfs(&binary_tree(), &options, &noop);

        assert!(positions["l"].y < positions["root"].y);
        assert!(positions["r"].y < positions["root"].y);
        assert!(positions["ll"].y < positions["l"].y);
        // Siblings share a depth, split left and right.
        assert_eq!(positions["l"].y, positions["r"].y);
        assert_ne!(positions["l"].x, positions["r"].x);
    }

    #[test]
    fn parent_centered_over_subtree() {
        let options = DfsOptions {
            start_node: Some("root".to_string()),
            ..Default::default()
        };
        let positions = dfs(&binary_tree(), &options, &noop);
        let mid = (positions["l"].x + positions["r"].x) / 2.0;
        assert!((positions["root"].x - mid).abs() < 1e-9);
    }

    #[test]
    fn horizontal_align_grows_rightward() {
        let options = DfsOptions {
            start_node: Some("root".to_string()),
            align: Align::Horizontal,
            ..Default::default()
        };
        let positions = dfs(&binary_tree(), &options, &noop);
        assert!(positions["l"].x > positions["root"].x);
        assert!(positions["ll"].x > positions["l"].x);
    }

    #[test]
    fn disconnected_nodes_still_placed() {
        let mut g = Graph::new();
        g.add_edge("a", "b").unwrap();
        g.add_node("island");
        let positions = dfs(&g.to_data(), &DfsOptions::default(), &noop);
        assert_eq!(positions.len(), 3);
    }
}
