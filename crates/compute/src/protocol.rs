//! Wire types exchanged between the pool and its workers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique task identifier, allocated by the pool from a monotonic
/// counter and rendered as `task_{n}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task_{}", self.0)
    }
}

impl Serialize for TaskId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.strip_prefix("task_")
            .and_then(|n| n.parse().ok())
            .map(TaskId)
            .ok_or_else(|| serde::de::Error::custom(format!("malformed task id '{raw}'")))
    }
}

/// What a façade submits: the pool assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub module: String,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl TaskSpec {
    pub fn new(module: impl Into<String>, function_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            module: module.into(),
            function_name: function_name.into(),
            args,
        }
    }

    pub(crate) fn with_id(self, id: TaskId) -> Task {
        Task {
            id,
            module: self.module,
            function_name: self.function_name,
            args: self.args,
        }
    }

    /// Affinity cache key, `"module:functionName"`. None when the
    /// descriptor is incomplete.
    pub fn affinity_key(&self) -> Option<String> {
        if self.module.is_empty() || self.function_name.is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.module, self.function_name))
    }
}

/// One unit of dispatched work, as posted into a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub module: String,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Response messages a worker emits for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WorkerReply {
    Progress {
        id: TaskId,
        /// Fraction complete in [0, 1], clamped by the adapter.
        progress: f64,
    },
    Complete {
        id: TaskId,
        result: Value,
    },
    Error {
        id: TaskId,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

/// What the pool receives on its worker channel.
#[derive(Debug)]
pub enum WorkerEvent {
    Reply(WorkerReply),
    /// Adapter-level failure (panicked worker thread, dead inbox).
    Fault { error: String },
}

/// Worker event tagged with its origin slot and spawn epoch.
///
/// The epoch increments on every (re)spawn of a slot; the pool drops
/// envelopes whose epoch is stale, which filters late messages from an
/// abandoned pre-restart thread.
#[derive(Debug)]
pub struct Envelope {
    pub worker_id: usize,
    pub epoch: u64,
    pub event: WorkerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_display() {
        assert_eq!(TaskId(7).to_string(), "task_7");
    }

    #[test]
    fn affinity_key_requires_both_parts() {
        let spec = TaskSpec::new("stats", "degree", vec![]);
        assert_eq!(spec.affinity_key().as_deref(), Some("stats:degree"));

        let incomplete = TaskSpec::new("", "degree", vec![]);
        assert_eq!(incomplete.affinity_key(), None);
    }

    #[test]
    fn reply_wire_format() {
        let reply = WorkerReply::Progress {
            id: TaskId(3),
            progress: 0.5,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "progress");
        assert_eq!(json["id"], "task_3");
        assert_eq!(json["progress"], 0.5);

        let err = WorkerReply::Error {
            id: TaskId(4),
            error: "boom".into(),
            stack: None,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("stack").is_none());
    }
}
