//! lattice-bench — exercises the pool end to end.
//!
//! Generates a random graph, runs the statistics, community, and
//! layout façades through a worker pool, and prints pool and affinity
//! diagnostics before terminating.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use lattice_compute::{
    CircularLayout, CommunityDetector, ExecOptions, ForceDirectedLayout, LayoutOptions,
    NetworkStats, PoolConfig, WorkerPool,
};
use lattice_graph::Graph;

// ── CLI ─────────────────────────────────────────────────────────────

/// Lattice benchmark — runs graph analytics through the worker pool.
#[derive(Parser, Debug)]
#[command(name = "lattice-bench", version, about)]
struct Cli {
    /// Number of nodes in the generated graph.
    #[arg(long, env = "LATTICE_NODES", default_value_t = 200)]
    nodes: usize,

    /// Number of random edges.
    #[arg(long, env = "LATTICE_EDGES", default_value_t = 600)]
    edges: usize,

    /// RNG seed for graph generation and layouts.
    #[arg(long, env = "LATTICE_SEED", default_value_t = 42)]
    seed: u64,

    /// Worker count. 0 = detected cores.
    #[arg(long, env = "LATTICE_WORKERS", default_value_t = 0)]
    workers: usize,
}

fn random_graph(nodes: usize, edges: usize, seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = Graph::new();
    for i in 0..nodes {
        graph.add_node(format!("n{i}"));
    }
    let target = edges.min(nodes.saturating_mul(nodes.saturating_sub(1)) / 2);
    while graph.edge_count() < target {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        if a == b {
            continue;
        }
        let _ = graph.add_edge(format!("n{a}"), format!("n{b}"));
    }
    graph
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let graph = random_graph(cli.nodes, cli.edges, cli.seed);
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "generated graph"
    );

    let pool = WorkerPool::initialize(PoolConfig {
        max_workers: cli.workers,
        ..PoolConfig::default()
    })
    .await?;

    let stats = NetworkStats::new(pool.clone());

    let summary = stats.summary(&graph, ExecOptions::default()).await?;
    info!(
        density = summary.density,
        components = summary.connected_components,
        average_degree = summary.average_degree,
        "summary"
    );

    let degree = stats.degree(&graph, ExecOptions::default()).await?;
    let max_degree = degree.values().cloned().fold(0.0f64, f64::max);
    info!(max_degree, "degree centrality");

    let betweenness = stats
        .betweenness(
            &graph,
            ExecOptions::default().with_progress(|p| info!(progress = p, "betweenness")),
        )
        .await?;
    info!(nodes = betweenness.len(), "betweenness centrality");

    let communities = CommunityDetector::new(pool.clone())
        .detect(&graph, ExecOptions::default())
        .await?;
    info!(
        modularity = communities.modularity,
        passes = communities.passes,
        "louvain"
    );

    let layout_options = LayoutOptions {
        scale: 100.0,
        seed: Some(cli.seed),
        ..LayoutOptions::default()
    };
    let circular = CircularLayout::with_options(pool.clone(), layout_options.clone())
        .positions(&graph, ExecOptions::default())
        .await?;
    info!(positions = circular.len(), "circular layout");

    let force = ForceDirectedLayout::with_options(pool.clone(), layout_options)
        .positions(
            &graph,
            ExecOptions::default().with_progress(|p| info!(progress = p, "force layout")),
        )
        .await?;
    info!(positions = force.len(), "force-directed layout");

    let status = pool.status().await;
    let affinity = pool.affinity_stats().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    println!("{}", serde_json::to_string_pretty(&affinity)?);

    pool.terminate(false).await;
    Ok(())
}
