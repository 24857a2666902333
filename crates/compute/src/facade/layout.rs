//! Layout façades. Each one dispatches a `layout` module function and
//! returns typed node positions.

use std::collections::HashMap;

use serde_json::{json, Value};

use lattice_graph::{Graph, NodeId};

use crate::algorithms::layouts::{LaplacianCoords, Position, Positions};
use crate::error::ComputeError;
use crate::pool::{ExecOptions, WorkerPool};

/// Options shared by every layout façade. `iterations` only affects
/// the force-directed layout.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub scale: f64,
    pub center: Position,
    pub seed: Option<u64>,
    pub iterations: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: Position::default(),
            seed: None,
            iterations: 50,
        }
    }
}

impl LayoutOptions {
    fn base_json(&self) -> Value {
        json!({
            "scale": self.scale,
            "center": { "x": self.center.x, "y": self.center.y },
            "seed": self.seed,
        })
    }
}

macro_rules! simple_layout {
    ($(#[$doc:meta])* $name:ident, $function:literal) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            pool: WorkerPool,
            options: LayoutOptions,
        }

        impl $name {
            pub fn new(pool: WorkerPool) -> Self {
                Self::with_options(pool, LayoutOptions::default())
            }

            pub fn with_options(pool: WorkerPool, options: LayoutOptions) -> Self {
                Self { pool, options }
            }

            pub async fn positions(
                &self,
                graph: &Graph,
                exec: ExecOptions,
            ) -> Result<Positions, ComputeError> {
                let options = self.options.base_json();
                super::run(&self.pool, "layout", $function, graph, options, exec).await
            }
        }
    };
}

simple_layout!(
    /// Uniform random placement.
    RandomLayout,
    "random"
);
simple_layout!(
    /// Evenly spaced placement on a circle.
    CircularLayout,
    "circular"
);
simple_layout!(
    /// Archimedean spiral in node insertion order.
    SpiralLayout,
    "spiral"
);

/// Concentric BFS rings around a center node (explicit, or the
/// highest-degree node when unset).
#[derive(Clone)]
pub struct RadialLayout {
    pool: WorkerPool,
    options: LayoutOptions,
    center_node: Option<NodeId>,
}

impl RadialLayout {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_options(pool, LayoutOptions::default(), None)
    }

    pub fn with_options(
        pool: WorkerPool,
        options: LayoutOptions,
        center_node: Option<NodeId>,
    ) -> Self {
        Self {
            pool,
            options,
            center_node,
        }
    }

    pub async fn positions(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<Positions, ComputeError> {
        let mut options = self.options.base_json();
        if let Some(center_node) = &self.center_node {
            options["centerNode"] = json!(center_node);
        }
        super::run(&self.pool, "layout", "radial", graph, options, exec).await
    }
}

/// Nested tree placement from a depth-first traversal.
#[derive(Clone)]
pub struct DfsLayout {
    pool: WorkerPool,
    options: LayoutOptions,
    start_node: Option<NodeId>,
}

impl DfsLayout {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_options(pool, LayoutOptions::default(), None)
    }

    pub fn with_options(
        pool: WorkerPool,
        options: LayoutOptions,
        start_node: Option<NodeId>,
    ) -> Self {
        Self {
            pool,
            options,
            start_node,
        }
    }

    pub async fn positions(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<Positions, ComputeError> {
        let mut options = self.options.base_json();
        if let Some(start_node) = &self.start_node {
            options["startNode"] = json!(start_node);
        }
        super::run(&self.pool, "layout", "dfs", graph, options, exec).await
    }
}

/// Two-column placement from a bipartite partition (explicit, or
/// derived by two-coloring when unset).
#[derive(Clone)]
pub struct BipartiteLayout {
    pool: WorkerPool,
    options: LayoutOptions,
    nodes: Option<Vec<NodeId>>,
}

impl BipartiteLayout {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_options(pool, LayoutOptions::default(), None)
    }

    pub fn with_options(
        pool: WorkerPool,
        options: LayoutOptions,
        nodes: Option<Vec<NodeId>>,
    ) -> Self {
        Self {
            pool,
            options,
            nodes,
        }
    }

    pub async fn positions(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<Positions, ComputeError> {
        let mut options = self.options.base_json();
        if let Some(nodes) = &self.nodes {
            options["nodes"] = json!(nodes);
        }
        super::run(&self.pool, "layout", "bipartite", graph, options, exec).await
    }
}

/// Concentric-ring placement with optional explicit shells.
#[derive(Clone)]
pub struct ShellLayout {
    pool: WorkerPool,
    options: LayoutOptions,
    shells: Option<Vec<Vec<NodeId>>>,
}

impl ShellLayout {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_options(pool, LayoutOptions::default(), None)
    }

    pub fn with_options(
        pool: WorkerPool,
        options: LayoutOptions,
        shells: Option<Vec<Vec<NodeId>>>,
    ) -> Self {
        Self {
            pool,
            options,
            shells,
        }
    }

    pub async fn positions(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<Positions, ComputeError> {
        let mut options = self.options.base_json();
        if let Some(shells) = &self.shells {
            options["shells"] = json!(shells);
        }
        super::run(&self.pool, "layout", "shell", graph, options, exec).await
    }
}

/// Fruchterman–Reingold force-directed placement.
#[derive(Clone)]
pub struct ForceDirectedLayout {
    pool: WorkerPool,
    options: LayoutOptions,
}

impl ForceDirectedLayout {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_options(pool, LayoutOptions::default())
    }

    pub fn with_options(pool: WorkerPool, options: LayoutOptions) -> Self {
        Self { pool, options }
    }

    pub async fn positions(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<Positions, ComputeError> {
        let mut options = self.options.base_json();
        options["iterations"] = json!(self.options.iterations);
        super::run(&self.pool, "layout", "force_directed", graph, options, exec).await
    }
}

/// Spectral placement over precomputed Laplacian eigenvector node
/// properties. Rejects graphs with nodes missing those properties
/// before dispatching any work.
#[derive(Clone)]
pub struct SpectralLayout {
    pool: WorkerPool,
    options: LayoutOptions,
    node_properties: HashMap<NodeId, LaplacianCoords>,
}

impl SpectralLayout {
    pub fn new(pool: WorkerPool, node_properties: HashMap<NodeId, LaplacianCoords>) -> Self {
        Self::with_options(pool, LayoutOptions::default(), node_properties)
    }

    pub fn with_options(
        pool: WorkerPool,
        options: LayoutOptions,
        node_properties: HashMap<NodeId, LaplacianCoords>,
    ) -> Self {
        Self {
            pool,
            options,
            node_properties,
        }
    }

    pub async fn positions(
        &self,
        graph: &Graph,
        exec: ExecOptions,
    ) -> Result<Positions, ComputeError> {
        let missing: Vec<&str> = graph
            .nodes()
            .filter(|id| !self.node_properties.contains_key(*id))
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

        let mut options = self.options.base_json();
        options["nodeProperties"] = serde_json::to_value(&self.node_properties)
            .map_err(|e| ComputeError::Algorithm(e.to_string()))?;
        super::run(&self.pool, "layout", "spectral", graph, options, exec).await
    }
}
