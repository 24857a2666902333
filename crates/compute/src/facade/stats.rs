//! Node- and graph-statistics façade.

use std::collections::HashMap;

use serde_json::Value;

use lattice_graph::{Graph, NodeId};

use crate::algorithms::graph_stats::{ComponentResult, GraphSummary};
use crate::error::ComputeError;
use crate::pool::{ExecOptions, WorkerPool};

/// Centrality and structure metrics computed through the pool.
#[derive(Clone)]
pub struct NetworkStats {
    pool: WorkerPool,
}

impl NetworkStats {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    async fn node_metric(
        &self,
        function: &str,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<HashMap<NodeId, f64>, ComputeError> {
        super::run(&self.pool, "stats", function, graph, Value::Null, exec).await
    }

    pub async fn degree(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<HashMap<NodeId, f64>, ComputeError> {
        self.node_metric("degree", graph, exec).await
    }

    pub async fn closeness(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<HashMap<NodeId, f64>, ComputeError> {
        self.node_metric("closeness", graph, exec).await
    }

    pub async fn betweenness(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<HashMap<NodeId, f64>, ComputeError> {
        self.node_metric("betweenness", graph, exec).await
    }

    pub async fn eigenvector(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<HashMap<NodeId, f64>, ComputeError> {
        self.node_metric("eigenvector", graph, exec).await
    }

    pub async fn clustering(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<HashMap<NodeId, f64>, ComputeError> {
        self.node_metric("clustering", graph, exec).await
    }

    pub async fn summary(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<GraphSummary, ComputeError> {
        super::run(&self.pool, "graph_stats", "summary", graph, Value::Null, exec).await
    }

    pub async fn components(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<ComponentResult, ComputeError> {
        super::run(&self.pool, "graph_stats", "components", graph, Value::Null, exec).await
    }
}
