//! Pure, stateless compute functions invoked by name through the
//! module registry.
//!
//! Every entry point has the same shape: deserialize a [`GraphData`]
//! snapshot and an options record from the task args, report progress
//! through the supplied callback, and return a JSON-serializable
//! result. Nothing here touches pool or worker state.

pub mod community;
pub mod graph_stats;
pub mod layouts;
pub mod node_stats;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use lattice_graph::GraphData;

use crate::error::ComputeError;

/// The serialized graph is always the first task argument.
pub(crate) fn graph_arg(args: &[Value]) -> Result<GraphData, ComputeError> {
    let raw = args.first().ok_or_else(|| ComputeError::InvalidArgument {
        name: "graphData".into(),
        message: "missing serialized graph".into(),
    })?;
    serde_json::from_value(raw.clone()).map_err(|e| ComputeError::InvalidArgument {
        name: "graphData".into(),
        message: e.to_string(),
    })
}

/// The options record is the optional second argument; absent or null
/// falls back to the options type's defaults.
pub(crate) fn options_arg<T>(args: &[Value]) -> Result<T, ComputeError>
where
    T: DeserializeOwned + Default,
{
    match args.get(1) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
            ComputeError::InvalidArgument {
                name: "options".into(),
                message: e.to_string(),
            }
        }),
    }
}

pub(crate) fn to_result<T: Serialize>(value: T) -> Result<Value, ComputeError> {
    serde_json::to_value(value).map_err(|e| ComputeError::Algorithm(e.to_string()))
}

/// Dense integer view of a snapshot, shared by the traversal-heavy
/// statistics and community algorithms.
pub(crate) struct Indexed<'a> {
    pub nodes: Vec<&'a str>,
    pub index: std::collections::HashMap<&'a str, usize>,
    /// Unweighted adjacency lists in node order.
    pub adj: Vec<Vec<usize>>,
}

impl<'a> Indexed<'a> {
    pub fn new(data: &'a GraphData) -> Self {
        let nodes: Vec<&str> = data.nodes.iter().map(String::as_str).collect();
        let index: std::collections::HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut adj = vec![Vec::new(); nodes.len()];
        for (i, &id) in nodes.iter().enumerate() {
            for neighbor in data.neighbors(id) {
                if let Some(&j) = index.get(neighbor.as_str()) {
                    adj[i].push(j);
                }
            }
        }

        Self { nodes, index, adj }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
