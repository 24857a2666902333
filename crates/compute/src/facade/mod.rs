//! Typed front-ends over the pool.
//!
//! A façade owns no algorithmic logic: it serializes the graph, builds
//! the `TaskSpec` for its registered module/function, delegates to
//! [`WorkerPool::execute`](crate::pool::WorkerPool::execute), and
//! deserializes the typed result.

mod community;
mod layout;
mod stats;

pub use community::{CommunityDetector, CommunityOptions};
pub use layout::{
    BipartiteLayout, CircularLayout, DfsLayout, ForceDirectedLayout, LayoutOptions, RadialLayout,
    RandomLayout, ShellLayout, SpectralLayout, SpiralLayout,
};
pub use stats::NetworkStats;

use serde::de::DeserializeOwned;
use serde_json::Value;

use lattice_graph::Graph;

use crate::error::ComputeError;
use crate::pool::{ExecOptions, WorkerPool};
use crate::protocol::TaskSpec;

/// Serialize the graph, dispatch, deserialize the typed result.
async fn run<T: DeserializeOwned>(
    pool: &WorkerPool,
    module: &str,
    function: &str,
    graph: &Graph,
    options: Value,
    exec: ExecOptions,
) -> Result<T, ComputeError> {
    let data = serde_json::to_value(graph.to_data()).map_err(|e| {
        ComputeError::InvalidArgument {
            name: "graph".into(),
            message: e.to_string(),
        }
    })?;

    let args = if options.is_null() {
        vec![data]
    } else {
        vec![data, options]
    };
    let result = pool
        .execute(TaskSpec::new(module, function, args), exec)
        .await?;

    serde_json::from_value(result).map_err(|e| {
        ComputeError::Algorithm(format!("unexpected {module}:{function} result shape: {e}"))
    })
}
