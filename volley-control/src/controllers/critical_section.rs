use crate::compile::CompiledNode;
use crate::lock::NamedLock;
use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// Serializes passes over its children across threads through a named lock
///
/// The lock is taken on the first call of a pass and released when the pass
/// ends or the last child finishes for good. An empty lock name turns the
/// controller into a plain sequence.
pub struct CriticalSectionPolicy {
    lock_name: String,
    held: Option<(Arc<NamedLock>, ThreadId)>,
    warned: bool,
}

impl CriticalSectionPolicy {
    pub fn new(lock_name: impl Into<String>) -> Self {
        Self {
            lock_name: lock_name.into(),
            held: None,
            warned: false,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    fn release(&mut self, node: &str) {
        if let Some((lock, owner)) = self.held.take() {
            if lock.unlock_for(owner) {
                debug!(node, lock = lock.name(), "Released critical section lock");
            }
        }
    }
}

impl ControllerPolicy for CriticalSectionPolicy {
    fn initialize(&mut self, _cursor: &mut Cursor, env: &mut Env<'_>) {
        let name = env.node().name.clone();
        self.release(&name);
    }

    fn before_next(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Option<Step> {
        if !cursor.first || cursor.children.is_empty() || self.held.is_some() {
            return None;
        }
        let lock_name = env.substitute(&self.lock_name);
        let lock_name = lock_name.trim();
        if lock_name.is_empty() {
            if !self.warned {
                warn!(node = %env.node().name, "Critical section has no lock name, running unlocked");
                self.warned = true;
            }
            return None;
        }

        let lock = env.shared.locks.get_or_create(lock_name);
        debug!(node = %env.node().name, lock = lock_name, thread = %env.ctx.thread_name, "Acquiring critical section lock");
        lock.lock();
        self.held = Some((lock, thread::current().id()));
        None
    }

    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        let name = env.node().name.clone();
        self.release(&name);
        self.re_initialize(cursor, env);
        Step::Return(None)
    }

    fn children_exhausted(&mut self, _cursor: &mut Cursor, env: &mut Env<'_>) {
        let name = env.node().name.clone();
        self.release(&name);
    }

    fn thread_finished(&mut self, node: &CompiledNode) {
        if let Some((lock, _)) = &self.held {
            warn!(
                node = %node.name,
                lock = lock.name(),
                "Thread finished while holding critical section lock, releasing it"
            );
        }
        self.release(&node.name);
    }
}
