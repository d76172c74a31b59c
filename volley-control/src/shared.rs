//! State shared by all virtual users of one test

use crate::compile::NodeId;
use crate::lock::LockRegistry;
use crate::resolve::IncludeCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::info;

/// Execution and iteration counts of one throughput controller
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputCounter {
    pub executions: i64,
    pub iterations: i64,
}

/// Counters for throughput controllers that are not per-thread, keyed by node
#[derive(Debug, Default)]
pub struct ThroughputCounters {
    counters: Mutex<HashMap<NodeId, ThroughputCounter>>,
}

impl ThroughputCounters {
    /// Run `f` on the node's counter while holding the table lock
    pub fn with_counter<R>(&self, node: NodeId, f: impl FnOnce(&mut ThroughputCounter) -> R) -> R {
        let mut counters = self.counters.lock();
        f(counters.entry(node).or_default())
    }

    pub fn get(&self, node: NodeId) -> ThroughputCounter {
        self.counters.lock().get(&node).copied().unwrap_or_default()
    }

    pub fn reset(&self) {
        self.counters.lock().clear();
    }
}

/// Process-scoped services handed to every traversal of a test
#[derive(Debug, Default)]
pub struct SharedState {
    pub locks: LockRegistry,
    pub throughput: ThroughputCounters,
    pub includes: IncludeCache,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset cross-thread counters and cached includes before a run
    pub fn test_started(&self) {
        info!("Test started, resetting shared controller state");
        self.throughput.reset();
        self.includes.clear();
    }

    /// Drop every named lock once all virtual users have finished
    pub fn test_ended(&self) {
        info!(locks = self.locks.len(), "Test ended, clearing named locks");
        self.locks.clear();
    }
}
