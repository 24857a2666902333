use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::algorithms::{graph_arg, options_arg, to_result};
use crate::error::ComputeError;

use super::{collect_positions, Position, Positions};

/// Precomputed Laplacian eigenvector coordinates for one node,
/// produced by an eigensolver upstream of the layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LaplacianCoords {
    pub laplacian_x: f64,
    pub laplacian_y: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpectralOptions {
    pub scale: f64,
    pub center: Position,
    /// Node id -> precomputed 2nd/3rd smallest Laplacian eigenvector
    /// components. Required; the layout itself is O(V).
    pub node_properties: Option<HashMap<NodeId, LaplacianCoords>>,
}

impl Default for SpectralOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: Position::default(),
            node_properties: None,
        }
    }
}

/// Spectral layout over precomputed Laplacian eigenvectors.
///
/// Fails fast when any node is missing its precomputed coordinates:
/// a silently degenerate placement is worse than an error the caller
/// can act on.
pub fn spectral(
    data: &GraphData,
    options: &SpectralOptions,
    progress: &dyn Fn(f64),
) -> Result<Positions, ComputeError> {
    if data.node_count() == 0 {
        progress(1.0);
        return Ok(Positions::new());
    }

    let Some(props) = options.node_properties.as_ref().filter(|p| !p.is_empty()) else {
        return Err(ComputeError::Algorithm(
            "spectral layout requires precomputed laplacian eigenvectors \
             (nodeProperties option with laplacian_x/laplacian_y per node)"
                .into(),
        ));
    };

    let missing: Vec<&str> = data
        .nodes
        .iter()
        .filter(|id| !props.contains_key(id.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        let shown = missing.iter().take(5).copied().collect::<Vec<_>>().join(", ");
        let suffix = if missing.len() > 5 { ", …" } else { "" };
        return Err(ComputeError::Algorithm(format!(
            "spectral layout: {} node(s) missing laplacian eigenvector properties: {shown}{suffix}",
            missing.len()
        )));
    }

    let coords: Vec<(f64, f64)> = data
        .nodes
        .iter()
        .map(|id| {
            let c = props[id.as_str()];
            (c.laplacian_x, c.laplacian_y)
        })
        .collect();
    progress(0.5);

    let positions = collect_positions(&data.nodes, coords, options.scale, options.center);
    progress(1.0);
    Ok(positions)
}

pub(crate) fn spectral_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: SpectralOptions = options_arg(args)?;
    to_result(spectral(&data, &options, progress)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_graph::Graph;

    fn noop(_: f64) {}

    fn line_graph() -> GraphData {
        let mut g = Graph::new();
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        g.to_data()
    }

    fn props_for(entries: &[(&str, f64, f64)]) -> HashMap<NodeId, LaplacianCoords> {
        entries
            .iter()
            .map(|&(id, x, y)| {
                (
                    id.to_string(),
                    LaplacianCoords {
                        laplacian_x: x,
                        laplacian_y: y,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn uses_precomputed_coordinates() {
        let options = SpectralOptions {
            scale: 1.0,
            node_properties: Some(props_for(&[
                ("a", -1.0, 0.0),
                ("b", 0.0, 0.0),
                ("c", 1.0, 0.0),
            ])),
            ..Default::default()
        };
        let positions = spectral(&line_graph(), &options, &noop).unwrap();

        // Relative order along x is preserved by rescaling.
        assert!(positions["a"].x < positions["b"].x);
        assert!(positions["b"].x < positions["c"].x);
    }

    #[test]
    fn missing_properties_fail_fast() {
        let options = SpectralOptions {
            node_properties: Some(props_for(&[("a", 0.0, 0.0)])),
            ..Default::default()
        };
        let err = spectral(&line_graph(), &options, &noop).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing laplacian eigenvector"));
        assert!(message.contains("b"));
    }

    #[test]
    fn absent_properties_rejected() {
        let err = spectral(&line_graph(), &SpectralOptions::default(), &noop).unwrap_err();
        assert!(matches!(err, ComputeError::Algorithm(_)));
    }
}
