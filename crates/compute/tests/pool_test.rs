//! Worker pool integration tests: affinity routing, queueing, timeout
//! isolation, and crash recovery against real worker threads.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use lattice_compute::{
    AlgorithmFn, ComputeError, ExecOptions, InlineWorkerFactory, ModuleRegistry, PoolConfig,
    TaskSpec, ThreadWorkerFactory, WorkerPool,
};
use lattice_graph::Graph;

// ── Fixtures ────────────────────────────────────────────────────────

static ORDER: Mutex<Vec<i64>> = Mutex::new(Vec::new());

fn slow(_args: &[Value], _progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    std::thread::sleep(Duration::from_millis(100));
    Ok(Value::Null)
}

fn hang(_args: &[Value], _progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    std::thread::sleep(Duration::from_secs(10));
    Ok(Value::Null)
}

fn panicking(_args: &[Value], _progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    panic!("fixture panic");
}

fn append(args: &[Value], _progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
    let n = args[0].as_i64().unwrap_or(-1);
    ORDER.lock().unwrap().push(n);
    Ok(Value::Null)
}

fn fixture_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::with_builtins();
    registry.register(
        "fixture",
        [
            ("slow", slow as AlgorithmFn),
            ("hang", hang as AlgorithmFn),
            ("panicking", panicking as AlgorithmFn),
            ("append", append as AlgorithmFn),
        ],
    );
    registry
}

async fn fixture_pool(workers: usize) -> WorkerPool {
    let factory = Arc::new(ThreadWorkerFactory::new(Arc::new(fixture_registry())));
    WorkerPool::with_factory(
        PoolConfig {
            max_workers: workers,
            ..PoolConfig::default()
        },
        factory,
    )
    .await
    .unwrap()
}

fn triangle_args() -> Vec<Value> {
    let mut g = Graph::new();
    g.add_edge("a", "b").unwrap();
    g.add_edge("b", "c").unwrap();
    g.add_edge("c", "a").unwrap();
    vec![serde_json::to_value(g.to_data()).unwrap()]
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn affinity_routes_repeated_tasks() {
    let pool = fixture_pool(2).await;

    for _ in 0..3 {
        let result = pool
            .execute(
                TaskSpec::new("stats", "degree", triangle_args()),
                ExecOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result["a"], json!(2.0));
        assert_eq!(result["b"], json!(2.0));
        assert_eq!(result["c"], json!(2.0));
    }

    let stats = pool.affinity_stats().await;
    assert!(stats.hits >= 1, "expected cache hits, got {stats:?}");
    assert!(stats
        .worker_caches
        .iter()
        .any(|w| w.cached_functions.contains(&"stats:degree".to_string())));

    pool.terminate(false).await;
}

#[tokio::test]
async fn unknown_module_lists_registered_modules() {
    let pool = fixture_pool(1).await;

    let err = pool
        .execute(
            TaskSpec::new("nonexistent", "degree", triangle_args()),
            ExecOptions::default(),
        )
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("'nonexistent' not found"));
    for name in ["stats", "graph_stats", "community", "layout"] {
        assert!(message.contains(name), "missing {name} in: {message}");
    }

    pool.terminate(false).await;
}

#[tokio::test]
async fn queued_tasks_run_in_submission_order() {
    ORDER.lock().unwrap().clear();
    let pool = fixture_pool(1).await;

    // The slow task occupies the only worker; the appends must queue
    // and run first-in first-out.
    let slow = pool.execute(TaskSpec::new("fixture", "slow", vec![]), ExecOptions::default());
    let a = pool.execute(
        TaskSpec::new("fixture", "append", vec![json!(1)]),
        ExecOptions::default(),
    );
    let b = pool.execute(
        TaskSpec::new("fixture", "append", vec![json!(2)]),
        ExecOptions::default(),
    );
    let c = pool.execute(
        TaskSpec::new("fixture", "append", vec![json!(3)]),
        ExecOptions::default(),
    );

    let (r0, r1, r2, r3) = tokio::join!(slow, a, b, c);
    assert!(r0.is_ok() && r1.is_ok() && r2.is_ok() && r3.is_ok());
    assert_eq!(*ORDER.lock().unwrap(), vec![1, 2, 3]);

    pool.terminate(false).await;
}

#[tokio::test]
async fn timeout_rejects_task_and_preserves_worker_count() {
    let pool = fixture_pool(2).await;

    let hung = pool.execute(
        TaskSpec::new("fixture", "hang", vec![]),
        ExecOptions::default().with_timeout(Duration::from_millis(100)),
    );
    // A second task on the other worker is unaffected.
    let healthy = pool.execute(
        TaskSpec::new("stats", "degree", triangle_args()),
        ExecOptions::default(),
    );

    let (hung, healthy) = tokio::join!(hung, healthy);
    assert_eq!(
        hung.unwrap_err(),
        ComputeError::TaskTimeout { timeout_ms: 100 }
    );
    assert!(healthy.is_ok());

    // The timed-out worker was replaced, not lost.
    let status = pool.status().await;
    assert_eq!(status.total_workers, 2);

    let again = pool
        .execute(
            TaskSpec::new("stats", "degree", triangle_args()),
            ExecOptions::default(),
        )
        .await;
    assert!(again.is_ok());

    pool.terminate(true).await;
}

#[tokio::test]
async fn panicking_task_rejects_only_itself() {
    let pool = fixture_pool(1).await;

    let err = pool
        .execute(TaskSpec::new("fixture", "panicking", vec![]), ExecOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ComputeError::WorkerExecution(_)));

    // Same slot, restarted with an empty cache, still serving tasks.
    let status = pool.status().await;
    assert_eq!(status.total_workers, 1);
    let stats = pool.affinity_stats().await;
    assert!(stats.worker_caches[0].cached_functions.is_empty());

    let result = pool
        .execute(
            TaskSpec::new("stats", "degree", triangle_args()),
            ExecOptions::default(),
        )
        .await;
    assert!(result.is_ok());

    pool.terminate(false).await;
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_one() {
    let pool = fixture_pool(1).await;

    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();
    pool.execute(
        TaskSpec::new("stats", "betweenness", triangle_args()),
        ExecOptions::default().with_progress(move |p| sink.lock().unwrap().push(p)),
    )
    .await
    .unwrap();

    let reported = reported.lock().unwrap();
    assert!(!reported.is_empty());
    assert!(reported.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*reported.last().unwrap(), 1.0);

    pool.terminate(false).await;
}

#[tokio::test]
async fn invalid_task_is_rejected_without_dispatch() {
    let pool = fixture_pool(1).await;

    let err = pool
        .execute(TaskSpec::new("", "degree", vec![]), ExecOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, ComputeError::InvalidTask);

    pool.terminate(false).await;
}

#[tokio::test]
async fn terminate_is_final_and_idempotent() {
    let pool = fixture_pool(1).await;
    pool.terminate(false).await;
    pool.terminate(false).await;

    let err = pool
        .execute(
            TaskSpec::new("stats", "degree", triangle_args()),
            ExecOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ComputeError::PoolTerminated);

    let status = pool.status().await;
    assert!(!status.initialized);
}

#[tokio::test]
async fn inline_factory_runs_without_threads() {
    let factory = Arc::new(InlineWorkerFactory::new(Arc::new(
        ModuleRegistry::with_builtins(),
    )));
    let pool = WorkerPool::with_factory(
        PoolConfig {
            max_workers: 1,
            ..PoolConfig::default()
        },
        factory,
    )
    .await
    .unwrap();

    let result = pool
        .execute(
            TaskSpec::new("stats", "degree", triangle_args()),
            ExecOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result["a"], json!(2.0));

    pool.terminate(false).await;
}
