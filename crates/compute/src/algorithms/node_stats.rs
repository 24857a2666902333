//! Node-level centrality statistics.
//!
//! Registered as the `stats` module: `degree`, `closeness`,
//! `betweenness`, `eigenvector`, `clustering`.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Deserialize;
use serde_json::Value;

use lattice_graph::{GraphData, NodeId};

use crate::error::ComputeError;

use super::{graph_arg, options_arg, to_result, Indexed};

/// Neighbor count per node.
pub fn degree(data: &GraphData, progress: &dyn Fn(f64)) -> HashMap<NodeId, f64> {
    let result = data
        .nodes
        .iter()
        .map(|id| (id.clone(), data.neighbors(id).len() as f64))
        .collect();
    progress(1.0);
    result
}

/// Closeness centrality with Wasserman–Faust normalization, so scores
/// remain comparable across disconnected components.
pub fn closeness(data: &GraphData, progress: &dyn Fn(f64)) -> HashMap<NodeId, f64> {
    let idx = Indexed::new(data);
    let n = idx.len();
    let mut result = HashMap::with_capacity(n);

    for (source, &id) in idx.nodes.iter().enumerate() {
        let dist = bfs_distances(&idx.adj, source);

        let mut reachable = 0usize;
        let mut total = 0u64;
        for d in dist.iter().flatten() {
            reachable += 1;
            total += *d;
        }
        // `reachable` includes the source itself at distance 0.
        let r = reachable.saturating_sub(1);

        let score = if r > 0 && total > 0 && n > 1 {
            (r as f64 / total as f64) * (r as f64 / (n - 1) as f64)
        } else {
            0.0
        };
        result.insert(id.to_string(), score);

        report_sources(progress, source, n);
    }

    progress(1.0);
    result
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BetweennessOptions {
    pub normalized: bool,
}

impl Default for BetweennessOptions {
    fn default() -> Self {
        Self { normalized: true }
    }
}

/// Betweenness centrality via Brandes' accumulation over BFS shortest
/// paths.
pub fn betweenness(
    data: &GraphData,
    options: &BetweennessOptions,
    progress: &dyn Fn(f64),
) -> HashMap<NodeId, f64> {
    let idx = Indexed::new(data);
    let n = idx.len();
    let mut centrality = vec![0.0f64; n];

    for source in 0..n {
        // Single-source shortest paths with path counts.
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![i64::MAX; n];
        sigma[source] = 1.0;
        dist[source] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &idx.adj[v] {
                if dist[w] == i64::MAX {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        // Dependency accumulation in reverse finish order.
        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }

        report_sources(progress, source, n);
    }

    // Undirected: every pair was counted from both endpoints.
    let mut scale = 0.5;
    if options.normalized && n > 2 {
        scale /= ((n - 1) * (n - 2)) as f64 / 2.0;
    }
    let result = idx
        .nodes
        .iter()
        .enumerate()
        .map(|(i, &id)| (id.to_string(), centrality[i] * scale))
        .collect();

    progress(1.0);
    result
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EigenvectorOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for EigenvectorOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Eigenvector centrality by power iteration on the adjacency matrix.
///
/// Fails when the iteration does not converge within the configured
/// budget (e.g. on bipartite structures).
pub fn eigenvector(
    data: &GraphData,
    options: &EigenvectorOptions,
    progress: &dyn Fn(f64),
) -> Result<HashMap<NodeId, f64>, ComputeError> {
    let idx = Indexed::new(data);
    let n = idx.len();
    if n == 0 {
        progress(1.0);
        return Ok(HashMap::new());
    }

    let mut x = vec![1.0 / n as f64; n];
    for iteration in 0..options.max_iterations {
        let mut next = vec![0.0f64; n];
        for (v, nbrs) in idx.adj.iter().enumerate() {
            for &w in nbrs {
                next[w] += x[v];
            }
        }

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm > 0.0 { norm } else { 1.0 };
        for v in next.iter_mut() {
            *v /= norm;
        }

        let drift: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        progress((iteration + 1) as f64 / options.max_iterations as f64);

        if drift < n as f64 * options.tolerance {
            progress(1.0);
            return Ok(idx
                .nodes
                .iter()
                .enumerate()
                .map(|(i, &id)| (id.to_string(), x[i]))
                .collect());
        }
    }

    Err(ComputeError::Algorithm(format!(
        "eigenvector centrality failed to converge within {} iterations",
        options.max_iterations
    )))
}

/// Local clustering coefficient: the fraction of a node's neighbor
/// pairs that are themselves connected.
pub fn clustering(data: &GraphData, progress: &dyn Fn(f64)) -> HashMap<NodeId, f64> {
    let idx = Indexed::new(data);
    let n = idx.len();
    let neighbor_sets: Vec<HashSet<usize>> = idx
        .adj
        .iter()
        .map(|nbrs| nbrs.iter().copied().collect())
        .collect();

    let mut result = HashMap::with_capacity(n);
    for (v, &id) in idx.nodes.iter().enumerate() {
        let nbrs = &idx.adj[v];
        let k = nbrs.len();
        let score = if k < 2 {
            0.0
        } else {
            let mut links = 0usize;
            for (a, &u) in nbrs.iter().enumerate() {
                for &w in &nbrs[a + 1..] {
                    if neighbor_sets[u].contains(&w) {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k * (k - 1)) as f64
        };
        result.insert(id.to_string(), score);
        report_sources(progress, v, n);
    }

    progress(1.0);
    result
}

/// BFS distances from one source; `None` for unreachable nodes.
fn bfs_distances(adj: &[Vec<usize>], source: usize) -> Vec<Option<u64>> {
    let mut dist = vec![None; adj.len()];
    dist[source] = Some(0);
    let mut queue = VecDeque::new();
    queue.push_back(source);
    while let Some(v) = queue.pop_front() {
        let d = dist[v].unwrap_or(0);
        for &w in &adj[v] {
            if dist[w].is_none() {
                dist[w] = Some(d + 1);
                queue.push_back(w);
            }
        }
    }
    dist
}

/// Report roughly one hundred progress updates across a per-source loop.
fn report_sources(progress: &dyn Fn(f64), done: usize, total: usize) {
    let stride = (total / 100).max(1);
    if (done + 1) % stride == 0 {
        progress((done + 1) as f64 / total as f64);
    }
}

// ── Registry entry points ────────────────────────────────────────────

pub(crate) fn degree_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    to_result(degree(&data, progress))
}

pub(crate) fn closeness_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    to_result(closeness(&data, progress))
}

pub(crate) fn betweenness_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: BetweennessOptions = options_arg(args)?;
    to_result(betweenness(&data, &options, progress))
}

pub(crate) fn eigenvector_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: EigenvectorOptions = options_arg(args)?;
    to_result(eigenvector(&data, &options, progress)?)
}

pub(crate) fn clustering_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    to_result(clustering(&data, progress))
}
