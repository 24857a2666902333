use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;

use lattice_graph::GraphData;

use crate::algorithms::{graph_arg, options_arg, to_result, Indexed};
use crate::error::ComputeError;

use super::{collect_positions, Position, Positions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceDirectedOptions {
    pub iterations: usize,
    /// Early-exit threshold on total displacement per iteration.
    pub convergence_threshold: f64,
    pub scale: f64,
    pub center: Position,
    pub seed: Option<u64>,
}

impl Default for ForceDirectedOptions {
    fn default() -> Self {
        Self {
            iterations: 50,
            convergence_threshold: 1e-4,
            scale: 1.0,
            center: Position::default(),
            seed: None,
        }
    }
}

/// Fruchterman–Reingold force-directed layout.
///
/// Repulsion between all node pairs, attraction along edges, with a
/// linearly cooling temperature cap on per-step displacement. Progress
/// is reported once per iteration.
pub fn force_directed(
    data: &GraphData,
    options: &ForceDirectedOptions,
    progress: &dyn Fn(f64),
) -> Positions {
    let idx = Indexed::new(data);
    let n = idx.len();
    if n == 0 {
        progress(1.0);
        return Positions::new();
    }
    if n == 1 {
        progress(1.0);
        let mut p = Positions::with_capacity(1);
        p.insert(data.nodes[0].clone(), options.center);
        return p;
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut pos: Vec<(f64, f64)> = (0..n).map(|_| (rng.gen::<f64>(), rng.gen::<f64>())).collect();

    // Optimal pairwise distance for a unit-square arena.
    let k = (1.0 / n as f64).sqrt();
    let mut temperature = 0.1;
    let iterations = options.iterations.max(1);
    let cooling = temperature / iterations as f64;

    for iteration in 0..iterations {
        let mut disp = vec![(0.0f64, 0.0f64); n];

        // Repulsion: every pair pushes apart with k²/d.
        for v in 0..n {
            for w in (v + 1)..n {
                let dx = pos[v].0 - pos[w].0;
                let dy = pos[v].1 - pos[w].1;
                let dist = (dx * dx + dy * dy).sqrt().max(1e-9);
                let force = k * k / dist;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[v].0 += fx;
                disp[v].1 += fy;
                disp[w].0 -= fx;
                disp[w].1 -= fy;
            }
        }

        // Attraction: edges pull together with d²/k.
        for (v, nbrs) in idx.adj.iter().enumerate() {
            for &w in nbrs {
                if w <= v {
                    continue;
                }
                let dx = pos[v].0 - pos[w].0;
                let dy = pos[v].1 - pos[w].1;
                let dist = (dx * dx + dy * dy).sqrt().max(1e-9);
                let force = dist * dist / k;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[v].0 -= fx;
                disp[v].1 -= fy;
                disp[w].0 += fx;
                disp[w].1 += fy;
            }
        }

        // Move, capped by the current temperature.
        let mut total_moved = 0.0;
        for v in 0..n {
            let (dx, dy) = disp[v];
            let len = (dx * dx + dy * dy).sqrt().max(1e-9);
            let step = len.min(temperature);
            pos[v].0 += dx / len * step;
            pos[v].1 += dy / len * step;
            total_moved += step;
        }

        temperature -= cooling;
        progress((iteration + 1) as f64 / iterations as f64);

        if total_moved < options.convergence_threshold {
            break;
        }
    }

    let positions = collect_positions(&data.nodes, pos, options.scale, options.center);
    progress(1.0);
    positions
}

pub(crate) fn force_directed_entry(
    args: &[Value],
    progress: &dyn Fn(f64),
) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: ForceDirectedOptions = options_arg(args)?;
    to_result(force_directed(&data, &options, progress))
}
