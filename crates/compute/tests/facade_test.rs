//! Façade integration tests: typed results end to end through the
//! pool.

use std::collections::HashMap;
use std::sync::Arc;

use lattice_compute::{
    BipartiteLayout, CircularLayout, CommunityDetector, ComputeError, ExecOptions,
    ForceDirectedLayout, InlineWorkerFactory, LaplacianCoords, LayoutOptions, ModuleRegistry,
    NetworkStats, PoolConfig, Position, RadialLayout, SpectralLayout, WorkerPool,
};
use lattice_graph::Graph;

async fn test_pool() -> WorkerPool {
    let factory = Arc::new(InlineWorkerFactory::new(Arc::new(
        ModuleRegistry::with_builtins(),
    )));
    WorkerPool::with_factory(
        PoolConfig {
            max_workers: 1,
            ..PoolConfig::default()
        },
        factory,
    )
    .await
    .unwrap()
}

fn triangle() -> Graph {
    let mut g = Graph::new();
    g.add_edge("a", "b").unwrap();
    g.add_edge("b", "c").unwrap();
    g.add_edge("c", "a").unwrap();
    g
}

/// Two triangles joined by a single bridge edge.
fn barbell() -> Graph {
    let mut g = Graph::new();
    for (u, v) in [
        ("a1", "a2"),
        ("a2", "a3"),
        ("a3", "a1"),
        ("b1", "b2"),
        ("b2", "b3"),
        ("b3", "b1"),
        ("a1", "b1"),
    ] {
        g.add_edge(u, v).unwrap();
    }
    g
}

#[tokio::test]
async fn degree_and_summary() {
    let pool = test_pool().await;
    let stats = NetworkStats::new(pool.clone());
    let graph = triangle();

    let degree = stats.degree(&graph, ExecOptions::default()).await.unwrap();
    assert_eq!(degree["a"], 2.0);
    assert_eq!(degree.len(), 3);

    let summary = stats.summary(&graph, ExecOptions::default()).await.unwrap();
    assert_eq!(summary.node_count, 3);
    assert_eq!(summary.edge_count, 3);
    assert_eq!(summary.connected_components, 1);
    assert!((summary.density - 1.0).abs() < 1e-9);
    assert!((summary.average_clustering - 1.0).abs() < 1e-9);

    pool.terminate(false).await;
}

#[tokio::test]
async fn components_split_disconnected_graph() {
    let pool = test_pool().await;
    let stats = NetworkStats::new(pool.clone());

    let mut g = Graph::new();
    g.add_edge("a", "b").unwrap();
    g.add_edge("c", "d").unwrap();

    let result = stats.components(&g, ExecOptions::default()).await.unwrap();
    assert_eq!(result.count, 2);
    assert_eq!(result.components["a"], result.components["b"]);
    assert_ne!(result.components["a"], result.components["c"]);

    pool.terminate(false).await;
}

#[tokio::test]
async fn louvain_separates_barbell_cliques() {
    let pool = test_pool().await;
    let detector = CommunityDetector::new(pool.clone());

    let result = detector.detect(&barbell(), ExecOptions::default()).await.unwrap();
    assert_eq!(result.communities["a1"], result.communities["a2"]);
    assert_eq!(result.communities["a1"], result.communities["a3"]);
    assert_eq!(result.communities["b1"], result.communities["b2"]);
    assert_ne!(result.communities["a1"], result.communities["b1"]);
    assert!(result.modularity > 0.2);

    pool.terminate(false).await;
}

#[tokio::test]
async fn circular_layout_spans_scale() {
    let pool = test_pool().await;
    let layout = CircularLayout::with_options(
        pool.clone(),
        LayoutOptions {
            scale: 10.0,
            ..LayoutOptions::default()
        },
    );

    let positions = layout.positions(&triangle(), ExecOptions::default()).await.unwrap();
    assert_eq!(positions.len(), 3);
    for p in positions.values() {
        let r = (p.x * p.x + p.y * p.y).sqrt();
        assert!((r - 10.0).abs() < 1e-9);
    }

    pool.terminate(false).await;
}

#[tokio::test]
async fn radial_layout_centers_the_hub() {
    let pool = test_pool().await;

    let mut g = Graph::new();
    for leaf in ["s1", "s2", "s3", "s4"] {
        g.add_edge("hub", leaf).unwrap();
    }

    let layout = RadialLayout::with_options(
        pool.clone(),
        LayoutOptions {
            scale: 8.0,
            ..LayoutOptions::default()
        },
        None,
    );
    let positions = layout.positions(&g, ExecOptions::default()).await.unwrap();
    assert_eq!(positions["hub"], Position::default());
    for leaf in ["s1", "s2", "s3", "s4"] {
        let p = positions[leaf];
        assert!((p.x.hypot(p.y) - 8.0).abs() < 1e-9);
    }

    pool.terminate(false).await;
}

#[tokio::test]
async fn bipartite_layout_rejects_odd_cycle() {
    let pool = test_pool().await;

    let layout = BipartiteLayout::new(pool.clone());
    let err = layout.positions(&triangle(), ExecOptions::default()).await.unwrap_err();
    assert!(matches!(err, ComputeError::WorkerExecution(_)));
    assert!(err.to_string().contains("not bipartite"));

    // An explicit partition sidesteps the two-coloring.
    let layout = BipartiteLayout::with_options(
        pool.clone(),
        LayoutOptions::default(),
        Some(vec!["a".to_string()]),
    );
    let positions = layout.positions(&triangle(), ExecOptions::default()).await.unwrap();
    assert_eq!(positions.len(), 3);
    assert_eq!(positions["b"].x, positions["c"].x);
    assert_ne!(positions["a"].x, positions["b"].x);

    pool.terminate(false).await;
}

#[tokio::test]
async fn force_layout_is_seeded_and_reports_progress() {
    let pool = test_pool().await;
    let layout = ForceDirectedLayout::with_options(
        pool.clone(),
        LayoutOptions {
            scale: 10.0,
            seed: Some(7),
            iterations: 20,
            ..LayoutOptions::default()
        },
    );

    let reported = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = reported.clone();
    let first = layout
        .positions(
            &triangle(),
            ExecOptions::default().with_progress(move |p| sink.lock().unwrap().push(p)),
        )
        .await
        .unwrap();
    let second = layout.positions(&triangle(), ExecOptions::default()).await.unwrap();

    assert_eq!(first, second);
    let reported = reported.lock().unwrap();
    assert!(reported.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*reported.last().unwrap(), 1.0);

    pool.terminate(false).await;
}

#[tokio::test]
async fn spectral_layout_requires_node_properties() {
    let pool = test_pool().await;

    // Coordinates for only one of three nodes: rejected before dispatch.
    let partial: HashMap<_, _> = [(
        "a".to_string(),
        LaplacianCoords {
            laplacian_x: 0.0,
            laplacian_y: 0.0,
        },
    )]
    .into();
    let layout = SpectralLayout::new(pool.clone(), partial);
    let err = layout.positions(&triangle(), ExecOptions::default()).await.unwrap_err();
    assert!(matches!(err, ComputeError::Algorithm(_)));
    assert!(err.to_string().contains("missing laplacian eigenvector"));

    let full: HashMap<_, _> = [
        ("a", (-1.0, 0.5)),
        ("b", (0.0, -1.0)),
        ("c", (1.0, 0.5)),
    ]
    .into_iter()
    .map(|(id, (x, y))| {
        (
            id.to_string(),
            LaplacianCoords {
                laplacian_x: x,
                laplacian_y: y,
            },
        )
    })
    .collect();
    let layout = SpectralLayout::with_options(
        pool.clone(),
        LayoutOptions {
            scale: 5.0,
            ..LayoutOptions::default()
        },
        full,
    );
    let positions = layout.positions(&triangle(), ExecOptions::default()).await.unwrap();
    assert_eq!(positions.len(), 3);
    assert!(positions["a"].x < positions["c"].x);
    assert_ne!(positions["a"], Position::default());

    pool.terminate(false).await;
}
