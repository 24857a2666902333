use thiserror::Error;

/// Error taxonomy for task dispatch and pool execution.
///
/// Every failure is reported to the original caller of
/// [`WorkerPool::execute`](crate::pool::WorkerPool::execute); nothing is
/// silently swallowed and no failed task is retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    /// Task descriptor missing its module or function name. Surfaced
    /// immediately, never dispatched.
    #[error("invalid task: module and functionName are required")]
    InvalidTask,

    #[error("module '{module}' not found in registry. Available modules: {available}")]
    ModuleNotFound { module: String, available: String },

    #[error("function '{function}' not found in module '{module}'. Available functions: {available}")]
    FunctionNotFound {
        module: String,
        function: String,
        available: String,
    },

    /// An algorithm argument failed to deserialize.
    #[error("invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// An algorithm rejected its input (e.g. a required precomputed
    /// node property is missing).
    #[error("{0}")]
    Algorithm(String),

    /// An algorithm failed or panicked inside a worker. The worker is
    /// restarted.
    #[error("worker execution failed: {0}")]
    WorkerExecution(String),

    /// No completion within the deadline. The worker still carrying the
    /// task is restarted.
    #[error("task timed out after {timeout_ms}ms")]
    TaskTimeout { timeout_ms: u64 },

    /// The execution substrate offers no isolation primitive. Fatal at
    /// pool initialization.
    #[error("workers not supported in this environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("worker pool terminated")]
    PoolTerminated,
}
