use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;

use lattice_graph::GraphData;

use crate::algorithms::{graph_arg, options_arg, to_result};
use crate::error::ComputeError;

use super::{collect_positions, Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomOptions {
    pub scale: f64,
    pub center: Position,
    /// Fixed seed for reproducible placements.
    pub seed: Option<u64>,
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: Position::default(),
            seed: None,
        }
    }
}

/// Uniform random placement.
pub fn random(data: &GraphData, options: &RandomOptions, progress: &dyn Fn(f64)) -> Positions {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let coords: Vec<(f64, f64)> = data
        .nodes
        .iter()
        .map(|_| (rng.gen::<f64>(), rng.gen::<f64>()))
        .collect();

    let positions = collect_positions(&data.nodes, coords, options.scale, options.center);
    progress(1.0);
    positions
}

pub(crate) fn random_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: RandomOptions = options_arg(args)?;
    to_result(random(&data, &options, progress))
}
