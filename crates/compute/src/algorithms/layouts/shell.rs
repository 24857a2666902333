use std::f64::consts::TAU;

use serde::Deserialize;
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::algorithms::{graph_arg, options_arg, to_result};
use crate::error::ComputeError;

use super::{Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShellOptions {
    pub scale: f64,
    pub center: Position,
    /// Explicit node groups, innermost first. When absent, every node
    /// shares a single shell (equivalent to a circular layout).
    pub shells: Option<Vec<Vec<NodeId>>>,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: Position::default(),
            shells: None,
        }
    }
}

/// Concentric-ring placement.
///
/// Nodes the caller left out of every shell are gathered into one
/// extra outermost ring so the result always covers the whole graph.
pub fn shell(
    data: &GraphData,
    options: &ShellOptions,
    progress: &dyn Fn(f64),
) -> Result<Positions, ComputeError> {
    let scale = options.scale;

    let mut shells: Vec<Vec<NodeId>> = match &options.shells {
        Some(explicit) => {
            for id in explicit.iter().flatten() {
                if !data.nodes.contains(id) {
                    return Err(ComputeError::Algorithm(format!(
                        "shell layout: unknown node '{id}' in shells option"
                    )));
                }
            }
            explicit.clone()
        }
        None => vec![data.nodes.clone()],
    };

    let placed: std::collections::HashSet<&str> = shells
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let leftover: Vec<NodeId> = data
        .nodes
        .iter()
        .filter(|id| !placed.contains(id.as_str()))
        .cloned()
        .collect();
    if !leftover.is_empty() {
        shells.push(leftover);
    }
    shells.retain(|s| !s.is_empty());

    let mut positions = Positions::with_capacity(data.node_count());
    let shell_count = shells.len();
    for (ring, members) in shells.iter().enumerate() {
        // Innermost ring hugs the center when there are multiple shells.
        let radius = scale * (ring + 1) as f64 / shell_count as f64;
        if members.len() == 1 && shell_count == 1 {
            positions.insert(members[0].clone(), options.center);
            continue;
        }
        for (i, id) in members.iter().enumerate() {
            let theta = TAU * i as f64 / members.len() as f64;
            positions.insert(
                id.clone(),
                Position::new(
                    radius * theta.cos() + options.center.x,
                    radius * theta.sin() + options.center.y,
                ),
            );
        }
    }

    progress(1.0);
    Ok(positions)
}

pub(crate) fn shell_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: ShellOptions = options_arg(args)?;
    to_result(shell(&data, &options, progress)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_graph::Graph;

    fn noop(_: f64) {}

    #[test]
    fn two_shells_have_distinct_radii() {
        let mut g = Graph::new();
        g.add_nodes_from(["hub", "a", "b", "c"]);
        let options = ShellOptions {
            scale: 10.0,
            shells: Some(vec![
                vec!["hub".to_string()],
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ]),
            ..Default::default()
        };
        let positions = shell(&g.to_data(), &options, &noop).unwrap();

        let radius = |id: &str| {
            let p = positions[id];
            (p.x * p.x + p.y * p.y).sqrt()
        };
        assert!((radius("hub") - 5.0).abs() < 1e-9);
        assert!((radius("a") - 10.0).abs() < 1e-9);
    }

    #[test]
    fn leftover_nodes_get_outer_ring() {
        let mut g = Graph::new();
        g.add_nodes_from(["a", "b", "stray"]);
        let options = ShellOptions {
            scale: 4.0,
            shells: Some(vec![vec!["a".to_string(), "b".to_string()]]),
            ..Default::default()
        };
        let positions = shell(&g.to_data(), &options, &noop).unwrap();
        assert_eq!(positions.len(), 3);
        assert!(positions.contains_key("stray"));
    }

    #[test]
    fn unknown_shell_member_rejected() {
        let mut g = Graph::new();
        g.add_node("a");
        let options = ShellOptions {
            shells: Some(vec![vec!["ghost".to_string()]]),
            ..Default::default()
        };
        let err = shell(&g.to_data(), &options, &noop).unwrap_err();
        assert!(matches!(err, ComputeError::Algorithm(_)));
    }
}
