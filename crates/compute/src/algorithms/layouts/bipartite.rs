use std::collections::{HashSet, VecDeque};

use serde::Deserialize;
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::algorithms::{graph_arg, options_arg, to_result, Indexed};
use crate::error::ComputeError;

use super::{collect_positions, Align, Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BipartiteOptions {
    /// Nodes forming the first column. When absent, the partition is
    /// derived by two-coloring; a non-bipartite graph is an error then.
    pub nodes: Option<Vec<NodeId>>,
    /// `vertical` stacks the two groups as columns, `horizontal` as rows.
    pub align: Align,
    pub scale: f64,
    pub center: Position,
    /// Width-to-height ratio of the layout area.
    pub aspect_ratio: f64,
}

impl Default for BipartiteOptions {
    fn default() -> Self {
        Self {
            nodes: None,
            align: Align::Vertical,
            scale: 1.0,
            center: Position::default(),
            aspect_ratio: 4.0 / 3.0,
        }
    }
}

/// Two parallel lines of nodes, one per partition side.
pub fn bipartite(
    data: &GraphData,
    options: &BipartiteOptions,
    progress: &dyn Fn(f64),
) -> Result<Positions, ComputeError> {
    let n = data.node_count();
    if n == 0 {
        progress(1.0);
        return Ok(Positions::new());
    }

    let first: HashSet<&str> = match &options.nodes {
        Some(explicit) => {
            for id in explicit {
                if !data.nodes.contains(id) {
                    return Err(ComputeError::Algorithm(format!(
                        "bipartite layout: unknown node '{id}' in nodes option"
                    )));
                }
            }
            explicit.iter().map(String::as_str).collect()
        }
        None => two_color(data)?,
    };
    progress(0.4);

    let (left, right): (Vec<&NodeId>, Vec<&NodeId>) = data
        .nodes
        .iter()
        .partition(|id| first.contains(id.as_str()));

    let height = 1.0;
    let width = options.aspect_ratio * height;
    let column = |members: &[&NodeId], x: f64, coords: &mut Vec<(NodeId, (f64, f64))>| {
        let len = members.len();
        for (i, id) in members.iter().enumerate() {
            let y = if len > 1 {
                height * i as f64 / (len - 1) as f64
            } else {
                height / 2.0
            };
            coords.push(((*id).clone(), (x, y)));
        }
    };

    let mut placed: Vec<(NodeId, (f64, f64))> = Vec::with_capacity(n);
    column(&left, 0.0, &mut placed);
    column(&right, width, &mut placed);
    progress(0.8);

    let (nodes, mut coords): (Vec<NodeId>, Vec<(f64, f64)>) = placed.into_iter().unzip();
    if options.align == Align::Horizontal {
        for c in coords.iter_mut() {
            *c = (c.1, c.0);
        }
    }

    let positions = collect_positions(&nodes, coords, options.scale, options.center);
    progress(1.0);
    Ok(positions)
}

/// BFS two-coloring. Returns the color-0 side, or an error naming an
/// odd cycle's endpoints when the graph is not bipartite.
fn two_color(data: &GraphData) -> Result<HashSet<&str>, ComputeError> {
    let idx = Indexed::new(data);
    let n = idx.len();
    let mut color = vec![None::<bool>; n];

    for start in 0..n {
        if color[start].is_some() {
            continue;
        }
        color[start] = Some(true);
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            let side = color[v].unwrap_or(true);
            for &w in &idx.adj[v] {
                match color[w] {
                    None => {
                        color[w] = Some(!side);
                        queue.push_back(w);
                    }
                    Some(other) if other == side => {
                        return Err(ComputeError::Algorithm(format!(
                            "bipartite layout: graph is not bipartite \
                             ('{}' and '{}' conflict); pass the partition \
                             via the nodes option",
                            idx.nodes[v], idx.nodes[w]
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    Ok(idx
        .nodes
        .iter()
        .zip(&color)
        .filter(|(_, c)| **c == Some(true))
        .map(|(&id, _)| id)
        .collect())
}

pub(crate) fn bipartite_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: BipartiteOptions = options_arg(args)?;
    to_result(bipartite(&data, &options, progress)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_graph::Graph;

    fn noop(_: f64) {}

    fn square() -> GraphData {
        let mut g = Graph::new();
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        g.add_edge("c", "d").unwrap();
        g.add_edge("d", "a").unwrap();
        g.to_data()
    }

    #[test]
    fn explicit_partition_forms_two_columns() {
        let options = BipartiteOptions {
            nodes: Some(vec!["a".to_string(), "c".to_string()]),
            ..Default::default()
        };
        let positions = bipartite(&square(), &options, &noop).unwrap();

        assert_eq!(positions["a"].x, positions["c"].x);
        assert_eq!(positions["b"].x, positions["d"].x);
        assert!(positions["a"].x < positions["b"].x);
    }

    #[test]
    fn partition_derived_when_absent() {
        let positions = bipartite(&square(), &BipartiteOptions::default(), &noop).unwrap();
        // The 4-cycle two-colors as {a, c} vs {b, d}.
        assert_eq!(positions["a"].x, positions["c"].x);
        assert_eq!(positions["b"].x, positions["d"].x);
        assert_ne!(positions["a"].x, positions["b"].x);
    }

    #[test]
    fn odd_cycle_rejected_without_partition() {
        let mut g = Graph::new();
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        g.add_edge("c", "a").unwrap();

        let err = bipartite(&g.to_data(), &BipartiteOptions::default(), &noop).unwrap_err();
        assert!(matches!(err, ComputeError::Algorithm(_)));
    }

    #[test]
    fn unknown_partition_member_rejected() {
        let options = BipartiteOptions {
            nodes: Some(vec!["ghost".to_string()]),
            ..Default::default()
        };
        let err = bipartite(&square(), &options, &noop).unwrap_err();
        assert!(matches!(err, ComputeError::Algorithm(_)));
    }
}
