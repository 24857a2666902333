//! Positional layout algorithms, registered as the `layout` module:
//! `random`, `circular`, `shell`, `spiral`, `radial`, `dfs`,
//! `bipartite`, `force_directed`, `spectral`.
//!
//! All layouts produce per-node 2D positions rescaled into
//! `[-scale, scale]` around a configurable center.

mod bipartite;
mod circular;
mod dfs;
mod force_directed;
mod radial;
mod random;
mod shell;
mod spectral;
mod spiral;

pub use bipartite::{bipartite, BipartiteOptions};
pub use circular::{circular, CircularOptions};
pub use dfs::{dfs, DfsOptions};
pub use force_directed::{force_directed, ForceDirectedOptions};
pub use radial::{radial, RadialOptions};
pub use random::{random, RandomOptions};
pub use shell::{shell, ShellOptions};
pub use spectral::{spectral, LaplacianCoords, SpectralOptions};
pub use spiral::{spiral, SpiralOptions};

pub(crate) use bipartite::bipartite_entry;
pub(crate) use circular::circular_entry;
pub(crate) use dfs::dfs_entry;
pub(crate) use force_directed::force_directed_entry;
pub(crate) use radial::radial_entry;
pub(crate) use random::random_entry;
pub(crate) use shell::shell_entry;
pub(crate) use spectral::spectral_entry;
pub(crate) use spiral::spiral_entry;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lattice_graph::NodeId;

/// A 2D node position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node id -> position, the result type of every layout.
pub type Positions = HashMap<NodeId, Position>;

/// Growth direction for the tree- and column-shaped layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Vertical,
    Horizontal,
}

/// Rescale positions to fit `[-scale, scale]` around `center`:
/// subtract the centroid, normalize by the largest absolute
/// coordinate, then scale and offset. Degenerate layouts (all nodes
/// coincident) collapse onto the center.
pub(crate) fn rescale(coords: &mut [(f64, f64)], scale: f64, center: Position) {
    let n = coords.len();
    if n == 0 {
        return;
    }

    let mean_x = coords.iter().map(|c| c.0).sum::<f64>() / n as f64;
    let mean_y = coords.iter().map(|c| c.1).sum::<f64>() / n as f64;

    let mut max_coord = 0.0f64;
    for c in coords.iter_mut() {
        c.0 -= mean_x;
        c.1 -= mean_y;
        max_coord = max_coord.max(c.0.abs()).max(c.1.abs());
    }

    if max_coord > 0.0 {
        let factor = scale / max_coord;
        for c in coords.iter_mut() {
            c.0 = c.0 * factor + center.x;
            c.1 = c.1 * factor + center.y;
        }
    } else {
        for c in coords.iter_mut() {
            *c = (center.x, center.y);
        }
    }
}

/// Zip node ids with rescaled coordinates into the result map.
pub(crate) fn collect_positions(
    nodes: &[NodeId],
    mut coords: Vec<(f64, f64)>,
    scale: f64,
    center: Position,
) -> Positions {
    rescale(&mut coords, scale, center);
    nodes
        .iter()
        .cloned()
        .zip(coords.into_iter().map(|(x, y)| Position::new(x, y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_fits_bounds() {
        let mut coords = vec![(0.0, 0.0), (2.0, 2.0), (1.0, 1.0)];
        rescale(&mut coords, 100.0, Position::default());

        let max = coords
            .iter()
            .flat_map(|c| [c.0.abs(), c.1.abs()])
            .fold(0.0f64, f64::max);
        assert!((max - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rescale_degenerate_collapses_to_center() {
        let mut coords = vec![(5.0, 5.0), (5.0, 5.0)];
        rescale(&mut coords, 10.0, Position::new(1.0, -1.0));
        assert_eq!(coords, vec![(1.0, -1.0), (1.0, -1.0)]);
    }
}
