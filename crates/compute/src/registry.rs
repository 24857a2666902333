//! Name-based dispatch table mapping `(module, function)` pairs to
//! algorithm entry points.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::algorithms::{community, graph_stats, layouts, node_stats};
use crate::error::ComputeError;
use crate::protocol::Task;

/// Signature every dispatchable algorithm entry conforms to: serialized
/// args in, progress callback, JSON result out.
pub type AlgorithmFn = fn(&[Value], &dyn Fn(f64)) -> Result<Value, ComputeError>;

/// Registry of callable modules. Built once, then shared read-only
/// (`Arc`) between the pool handle and every worker thread.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, IndexMap<&'static str, AlgorithmFn>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in algorithm modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(
            "stats",
            [
                ("degree", node_stats::degree_entry as AlgorithmFn),
                ("closeness", node_stats::closeness_entry),
                ("betweenness", node_stats::betweenness_entry),
                ("eigenvector", node_stats::eigenvector_entry),
                ("clustering", node_stats::clustering_entry),
            ],
        );
        registry.register(
            "graph_stats",
            [
                ("summary", graph_stats::summary_entry as AlgorithmFn),
                ("components", graph_stats::components_entry),
            ],
        );
        registry.register(
            "community",
            [
                ("louvain", community::louvain_entry as AlgorithmFn),
                ("label_propagation", community::label_propagation_entry),
                ("modularity", community::modularity_entry),
            ],
        );
        registry.register(
            "layout",
            [
                ("random", layouts::random_entry as AlgorithmFn),
                ("circular", layouts::circular_entry),
                ("shell", layouts::shell_entry),
                ("spiral", layouts::spiral_entry),
                ("radial", layouts::radial_entry),
                ("dfs", layouts::dfs_entry),
                ("bipartite", layouts::bipartite_entry),
                ("force_directed", layouts::force_directed_entry),
                ("spectral", layouts::spectral_entry),
            ],
        );

        registry
    }

    /// Adds (or replaces) a module. Tests use this to install slow and
    /// panicking fixtures.
    pub fn register<I>(&mut self, module: impl Into<String>, functions: I)
    where
        I: IntoIterator<Item = (&'static str, AlgorithmFn)>,
    {
        let module = module.into();
        let functions: IndexMap<&'static str, AlgorithmFn> = functions.into_iter().collect();
        debug!(module = %module, functions = functions.len(), "registering module");
        self.modules.insert(module, functions);
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Looks up and invokes the task's target function.
    pub fn execute_task(
        &self,
        task: &Task,
        progress: &dyn Fn(f64),
    ) -> Result<Value, ComputeError> {
        if task.module.is_empty() || task.function_name.is_empty() {
            return Err(ComputeError::InvalidTask);
        }

        let functions = self.modules.get(&task.module).ok_or_else(|| {
            ComputeError::ModuleNotFound {
                module: task.module.clone(),
                available: self.module_names().collect::<Vec<_>>().join(", "),
            }
        })?;

        let function = functions.get(task.function_name.as_str()).ok_or_else(|| {
            ComputeError::FunctionNotFound {
                module: task.module.clone(),
                function: task.function_name.clone(),
                available: functions.keys().copied().collect::<Vec<_>>().join(", "),
            }
        })?;

        debug!(
            task_id = %task.id,
            module = %task.module,
            function = %task.function_name,
            "executing task"
        );
        function(&task.args, progress)
    }
}
