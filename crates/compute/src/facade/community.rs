//! Community-detection façade.

use serde_json::json;

use lattice_graph::Graph;

use crate::algorithms::community::CommunityResult;
use crate::error::ComputeError;
use crate::pool::{ExecOptions, WorkerPool};

#[derive(Debug, Clone)]
pub struct CommunityOptions {
    /// Modularity resolution; >1 favors smaller communities.
    pub resolution: f64,
    pub max_passes: usize,
}

impl Default for CommunityOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 10,
        }
    }
}

/// Louvain community detection through the pool.
#[derive(Clone)]
pub struct CommunityDetector {
    pool: WorkerPool,
    options: CommunityOptions,
}

impl CommunityDetector {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_options(pool, CommunityOptions::default())
    }

    pub fn with_options(pool: WorkerPool, options: CommunityOptions) -> Self {
        Self { pool, options }
    }

    pub async fn detect(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<CommunityResult, ComputeError> {
        let options = json!({
            "resolution": self.options.resolution,
            "maxPasses": self.options.max_passes,
        });
        super::run(&self.pool, "community", "louvain", graph, options, exec).await
    }

    /// Fast label-propagation alternative to Louvain. Returns raw
    /// node -> label assignments without a modularity score.
    pub async fn detect_label_propagation(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<std::collections::HashMap<lattice_graph::NodeId, u64>, ComputeError> {
        super::run(
            &self.pool,
            "community",
            "label_propagation",
            graph,
            serde_json::Value::Null,
            exec,
        )
        .await
    }
}
