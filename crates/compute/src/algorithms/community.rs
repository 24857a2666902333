//! Community detection, registered as the `community` module:
//! `louvain`, `label_propagation`, `modularity`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use lattice_graph::{GraphData, NodeId};

use crate::error::ComputeError;

use super::{graph_arg, options_arg, to_result, Indexed};

/// Weighted undirected graph at one Louvain aggregation level.
struct Level {
    /// Neighbor lists excluding self-loops.
    adj: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight per node (intra-weight of a collapsed community).
    loops: Vec<f64>,
    /// Weighted degree per node, self-loops counting twice.
    k: Vec<f64>,
    /// Total weight times two (sum of `k`).
    m2: f64,
}

impl Level {
    fn from_data(data: &GraphData) -> Self {
        let idx = Indexed::new(data);
        let n = idx.len();
        let mut adj = vec![Vec::new(); n];
        let mut loops = vec![0.0; n];

        for edge in &data.edges {
            let (Some(&u), Some(&v)) = (
                idx.index.get(edge.source.as_str()),
                idx.index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if u == v {
                loops[u] += edge.weight;
            } else {
                adj[u].push((v, edge.weight));
                adj[v].push((u, edge.weight));
            }
        }

        Self::finish(adj, loops)
    }

    fn finish(adj: Vec<Vec<(usize, f64)>>, loops: Vec<f64>) -> Self {
        let k: Vec<f64> = adj
            .iter()
            .zip(&loops)
            .map(|(nbrs, &lw)| nbrs.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * lw)
            .collect();
        let m2 = k.iter().sum();
        Self { adj, loops, k, m2 }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LouvainOptions {
    /// Modularity resolution; >1 favors smaller communities.
    pub resolution: f64,
    /// Maximum number of move-and-aggregate passes.
    pub max_passes: usize,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityResult {
    /// Node id -> community label (0-based, relabeled densely).
    pub communities: HashMap<NodeId, u64>,
    /// Modularity of the final partition, in [-1, 1].
    pub modularity: f64,
    /// Number of passes actually performed.
    pub passes: usize,
}

/// Louvain community detection: greedy local moving followed by
/// community aggregation, repeated until modularity stops improving.
pub fn louvain(
    data: &GraphData,
    options: &LouvainOptions,
    progress: &dyn Fn(f64),
) -> CommunityResult {
    let n = data.node_count();
    if n == 0 {
        progress(1.0);
        return CommunityResult {
            communities: HashMap::new(),
            modularity: 0.0,
            passes: 0,
        };
    }

    let mut level = Level::from_data(data);
    // membership[i] = community of original node i, updated per pass
    let mut membership: Vec<usize> = (0..n).collect();
    let mut passes = 0;

    for pass in 0..options.max_passes {
        let (community, moved) = local_move(&level, options.resolution);
        passes = pass + 1;
        progress((pass + 1) as f64 / options.max_passes as f64);

        if !moved {
            break;
        }

        let (next_level, mapping) = aggregate(&level, &community);
        for m in membership.iter_mut() {
            *m = mapping[*m];
        }
        if next_level.len() == level.len() {
            break;
        }
        level = next_level;
    }

    // Dense 0-based relabel in first-appearance order.
    let mut relabel: HashMap<usize, u64> = HashMap::new();
    let mut communities = HashMap::with_capacity(n);
    for (i, id) in data.nodes.iter().enumerate() {
        let next = relabel.len() as u64;
        let label = *relabel.entry(membership[i]).or_insert(next);
        communities.insert(id.clone(), label);
    }

    let q = partition_modularity(data, &communities, options.resolution);
    debug!(
        communities = relabel.len(),
        modularity = q,
        passes,
        "louvain finished"
    );
    progress(1.0);

    CommunityResult {
        communities,
        modularity: q,
        passes,
    }
}

/// One sweep phase: repeatedly move nodes to the neighboring community
/// with the highest modularity gain until a full sweep makes no move.
fn local_move(level: &Level, resolution: f64) -> (Vec<usize>, bool) {
    let n = level.len();
    let mut community: Vec<usize> = (0..n).collect();
    let mut tot: Vec<f64> = level.k.clone();
    let mut any_moved = false;

    if level.m2 <= 0.0 {
        return (community, false);
    }

    loop {
        let mut moved_this_sweep = false;

        for v in 0..n {
            let current = community[v];

            // Weight from v into each neighboring community.
            let mut weights: HashMap<usize, f64> = HashMap::new();
            for &(w, weight) in &level.adj[v] {
                *weights.entry(community[w]).or_default() += weight;
            }

            // Detach v before evaluating gains.
            tot[current] -= level.k[v];

            let base = weights.get(&current).copied().unwrap_or(0.0)
                - resolution * level.k[v] * tot[current] / level.m2;

            let mut best = current;
            let mut best_gain = base;
            for (&candidate, &w_in) in &weights {
                if candidate == current {
                    continue;
                }
                let gain = w_in - resolution * level.k[v] * tot[candidate] / level.m2;
                if gain > best_gain + 1e-12 {
                    best = candidate;
                    best_gain = gain;
                }
            }

            tot[best] += level.k[v];
            if best != current {
                community[v] = best;
                moved_this_sweep = true;
                any_moved = true;
            }
        }

        if !moved_this_sweep {
            break;
        }
    }

    (community, any_moved)
}

/// Collapse communities into super-nodes. Returns the new level and the
/// old-community -> new-node renumbering.
fn aggregate(level: &Level, community: &[usize]) -> (Level, Vec<usize>) {
    let n = level.len();
    let mut renumbered = vec![usize::MAX; n];
    let mut next = 0usize;
    for v in 0..n {
        let c = community[v];
        if renumbered[c] == usize::MAX {
            renumbered[c] = next;
            next += 1;
        }
    }

    let mut loops = vec![0.0; next];
    let mut weights: Vec<HashMap<usize, f64>> = vec![HashMap::new(); next];

    for v in 0..n {
        let cv = renumbered[community[v]];
        loops[cv] += level.loops[v];
        for &(w, weight) in &level.adj[v] {
            let cw = renumbered[community[w]];
            if cv == cw {
                // Each internal edge is visited from both endpoints.
                loops[cv] += weight / 2.0;
            } else {
                *weights[cv].entry(cw).or_default() += weight;
            }
        }
    }

    let adj = weights
        .into_iter()
        .map(|m| m.into_iter().collect())
        .collect();

    let mapping: Vec<usize> = community.iter().map(|&c| renumbered[c]).collect();
    (Level::finish(adj, loops), mapping)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelPropagationOptions {
    pub max_iterations: usize,
}

impl Default for LabelPropagationOptions {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Detect communities via label propagation.
///
/// Each node starts with a unique label (0..N). On each iteration, every
/// node adopts the most frequent label among its neighbors. Ties are
/// broken by choosing the smallest label for determinism.
pub fn label_propagation(
    data: &GraphData,
    options: &LabelPropagationOptions,
    progress: &dyn Fn(f64),
) -> HashMap<NodeId, u64> {
    let idx = Indexed::new(data);
    let n = idx.len();
    if n == 0 {
        progress(1.0);
        return HashMap::new();
    }

    let mut labels: Vec<u64> = (0..n as u64).collect();

    for iteration in 0..options.max_iterations {
        let mut changed = false;

        for v in 0..n {
            let mut counts: HashMap<u64, usize> = HashMap::new();
            for &w in &idx.adj[v] {
                *counts.entry(labels[w]).or_default() += 1;
            }
            if counts.is_empty() {
                continue; // isolated node keeps its label
            }

            let max_count = *counts.values().max().unwrap_or(&0);
            let best = counts
                .iter()
                .filter(|(_, &c)| c == max_count)
                .map(|(&label, _)| label)
                .min()
                .unwrap_or(labels[v]);

            if labels[v] != best {
                labels[v] = best;
                changed = true;
            }
        }

        progress((iteration + 1) as f64 / options.max_iterations as f64);
        if !changed {
            debug!(iterations = iteration + 1, "label propagation converged");
            break;
        }
    }

    progress(1.0);
    idx.nodes
        .iter()
        .enumerate()
        .map(|(i, &id)| (id.to_string(), labels[i]))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModularityOptions {
    /// Externally supplied partition to score.
    pub communities: HashMap<NodeId, u64>,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    1.0
}

impl Default for ModularityOptions {
    fn default() -> Self {
        Self {
            communities: HashMap::new(),
            resolution: 1.0,
        }
    }
}

/// Modularity of a partition: the fraction of weight falling inside
/// communities minus the expectation under the configuration model.
pub fn partition_modularity(
    data: &GraphData,
    communities: &HashMap<NodeId, u64>,
    resolution: f64,
) -> f64 {
    let mut degree: HashMap<&str, f64> = HashMap::new();
    let mut m2 = 0.0;
    for edge in &data.edges {
        if edge.source == edge.target {
            // A self-loop contributes 2w to its node's degree, once.
            *degree.entry(edge.source.as_str()).or_default() += 2.0 * edge.weight;
        } else {
            *degree.entry(edge.source.as_str()).or_default() += edge.weight;
            *degree.entry(edge.target.as_str()).or_default() += edge.weight;
        }
        m2 += 2.0 * edge.weight;
    }
    if m2 <= 0.0 {
        return 0.0;
    }

    let mut intra: HashMap<u64, f64> = HashMap::new();
    for edge in &data.edges {
        let (Some(&cu), Some(&cv)) = (
            communities.get(edge.source.as_str()),
            communities.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if cu == cv {
            *intra.entry(cu).or_default() += 2.0 * edge.weight;
        }
    }

    let mut tot: HashMap<u64, f64> = HashMap::new();
    for id in &data.nodes {
        if let Some(&c) = communities.get(id.as_str()) {
            *tot.entry(c).or_default() += degree.get(id.as_str()).copied().unwrap_or(0.0);
        }
    }

    let mut q = 0.0;
    for (&c, &t) in &tot {
        let inner = intra.get(&c).copied().unwrap_or(0.0);
        q += inner / m2 - resolution * (t / m2) * (t / m2);
    }
    q
}

// ── Registry entry points ────────────────────────────────────────────

pub(crate) fn louvain_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: LouvainOptions = options_arg(args)?;
    to_result(louvain(&data, &options, progress))
}

pub(crate) fn label_propagation_entry(
    args: &[Value],
    progress: &dyn Fn(f64),
) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: LabelPropagationOptions = options_arg(args)?;
    to_result(label_propagation(&data, &options, progress))
}

pub(crate) fn modularity_entry(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let data = graph_arg(args)?;
    let options: ModularityOptions = options_arg(args)?;
    let q = partition_modularity(&data, &options.communities, options.resolution);
    progress(1.0);
    to_result(q)
}
