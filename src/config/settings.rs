//! Thread and demo settings
//!
//! Settings that shape how nodes spawn their background threads, kept
//! separate from the file handling in the parent module.
//!
//! # Main Types
//!
//! - [`ThreadSettings`] - Thread naming and stack sizes for tasks and queue workers
//! - [`DemoSettings`] - Producer pacing used by the `relay-demo` binary

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Default prefix for every thread spawned by a node
pub const DEFAULT_THREAD_PREFIX: &str = "relay";

/// Which kind of thread a node is about to spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRole {
    /// The node's long-running background task
    Task,
    /// A transient queue worker draining the input queue
    InputWorker,
    /// A transient queue worker draining the output queue
    OutputWorker,
    /// Short-lived thread stopping a node whose context was cancelled
    ContextWatcher,
}

impl ThreadRole {
    fn suffix(self) -> &'static str {
        match self {
            ThreadRole::Task => "task",
            ThreadRole::InputWorker => "in",
            ThreadRole::OutputWorker => "out",
            ThreadRole::ContextWatcher => "ctx",
        }
    }
}

/// Thread settings applied by nodes and queue processors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSettings {
    /// Prefix for thread names (`<prefix>-<node id>-<role>`)
    pub prefix: String,

    /// Stack size for node task threads, platform default when unset
    pub task_stack_size: Option<usize>,

    /// Stack size for queue worker threads, platform default when unset
    pub worker_stack_size: Option<usize>,
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_THREAD_PREFIX.to_string(),
            task_stack_size: None,
            worker_stack_size: None,
        }
    }
}

impl ThreadSettings {
    /// Thread name for a node's thread of the given role
    pub fn thread_name(&self, node_id: &str, role: ThreadRole) -> String {
        if node_id.is_empty() {
            format!("{}-{}", self.prefix, role.suffix())
        } else {
            format!("{}-{}-{}", self.prefix, node_id, role.suffix())
        }
    }

    /// A configured [`thread::Builder`] for a node's thread of the given role
    pub fn builder(&self, node_id: &str, role: ThreadRole) -> thread::Builder {
        let builder = thread::Builder::new().name(self.thread_name(node_id, role));
        let stack_size = match role {
            ThreadRole::Task => self.task_stack_size,
            ThreadRole::InputWorker | ThreadRole::OutputWorker | ThreadRole::ContextWatcher => {
                self.worker_stack_size
            }
        };
        match stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}

/// Pacing for the demo producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Delay between produced chunks in milliseconds
    pub interval_ms: u64,

    /// How long the demo pipeline runs before it is stopped
    pub run_ms: u64,

    /// First value emitted by the producer
    pub start_value: i64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2,
            run_ms: 50,
            start_value: 100,
        }
    }
}

impl DemoSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn run_time(&self) -> Duration {
        Duration::from_millis(self.run_ms)
    }
}
