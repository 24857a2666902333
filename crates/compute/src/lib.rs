pub mod algorithms;
pub mod error;
pub mod facade;
pub mod pool;
pub mod protocol;
pub mod registry;
pub mod worker;

pub use algorithms::community::CommunityResult;
pub use algorithms::graph_stats::{ComponentResult, GraphSummary};
pub use algorithms::layouts::{Align, LaplacianCoords, Position, Positions};
pub use error::ComputeError;
pub use facade::{
    BipartiteLayout, CircularLayout, CommunityDetector, CommunityOptions, DfsLayout,
    ForceDirectedLayout, LayoutOptions, NetworkStats, RadialLayout, RandomLayout, ShellLayout,
    SpectralLayout, SpiralLayout,
};
pub use pool::{AffinityStats, ExecOptions, PoolConfig, PoolStatus, WorkerPool};
pub use protocol::{TaskId, TaskSpec};
pub use registry::{AlgorithmFn, ModuleRegistry};
pub use worker::{InlineWorkerFactory, ThreadWorkerFactory, WorkerAdapter, WorkerFactory};
