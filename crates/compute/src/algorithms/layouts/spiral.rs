use serde::Deserialize;
use serde_json::Value;

use lattice_graph::GraphData;

use crate::algorithms::{graph_arg, options_arg, to_result};
use crate::error::ComputeError;

use super::{collect_positions, Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpiralOptions {
    pub scale: f64,
    pub center: Position,
    /// Radians of rotation per node; lower values wind tighter.
    pub resolution: f64,
    /// Keep a constant arc length between consecutive nodes instead of
    /// a constant angle.
    pub equidistant: bool,
}

impl Default for SpiralOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: Position::default(),
            resolution: 0.35,
            equidistant: false,
        }
    }
}

/// Archimedean spiral in node insertion order.
pub fn spiral(data: &GraphData, options: &SpiralOptions, progress: &dyn Fn(f64)) -> Positions {
    let n = data.node_count();
    if n == 0 {
        progress(1.0);
        return Positions::new();
    }

    let mut coords = Vec::with_capacity(n);
    if options.equidistant {
        let chord = 1.0;
        let step = 0.5;
        let mut theta = options.resolution;
        theta += chord / (step * theta);
        for _ in 0..n {
            let r = step * theta;
            theta += chord / r;
            coords.push((r * theta.cos(), r * theta.sin()));
        }
    } else {
        for i in 0..n {
            let angle = options.resolution * i as f64;
            let r = i as f64;
            coords.push((r * angle.cos(), r * angle.sin()));
        }
    }
    progress(0.8);

    let positions = collect_positions(&data.nodes, coords, options.scale, options.center);
    progress(1.0);
    positions
}

pub(crate) fn spiral_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: SpiralOptions = options_arg(args)?;
    to_result(spiral(&data, &options, progress))
}
