//! Shared graph data model for the lattice compute engine.
//!
//! [`Graph`] is the live, caller-owned representation: a weighted,
//! undirected adjacency map. [`GraphData`] is the plain transfer form
//! copied into each compute task — no behavior, independently owned by
//! the worker that receives it.

pub mod data;
pub mod model;

pub use data::{EdgeData, GraphData};
pub use model::{Graph, GraphError, NodeId};
