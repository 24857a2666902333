use std::f64::consts::TAU;

use serde::Deserialize;
use serde_json::Value;

use lattice_graph::GraphData;

use crate::algorithms::{graph_arg, options_arg, to_result};
use crate::error::ComputeError;

use super::{Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircularOptions {
    pub scale: f64,
    pub center: Position,
}

impl Default for CircularOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: Position::default(),
        }
    }
}

/// Evenly spaced placement on a single circle, in node insertion order.
pub fn circular(data: &GraphData, options: &CircularOptions, progress: &dyn Fn(f64)) -> Positions {
    let n = data.node_count();
    let positions = if n == 1 {
        // A single node sits at the center.
        let mut p = Positions::with_capacity(1);
        p.insert(data.nodes[0].clone(), options.center);
        p
    } else {
        data.nodes
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let theta = TAU * i as f64 / n as f64;
                (
                    id.clone(),
                    Position::new(
                        options.scale * theta.cos() + options.center.x,
                        options.scale * theta.sin() + options.center.y,
                    ),
                )
            })
            .collect()
    };

    progress(1.0);
    positions
}

pub(crate) fn circular_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: CircularOptions = options_arg(args)?;
    to_result(circular(&data, &options, progress))
}
