//! Named reentrant locks shared by every virtual user of a test

use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::debug;

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    holds: usize,
}

/// Reentrant mutex identified by name
///
/// The owning thread may lock it again without blocking; every `lock` must be
/// matched by an `unlock_for` from the same thread.
#[derive(Debug)]
pub struct NamedLock {
    name: String,
    state: Mutex<LockState>,
    released: Condvar,
}

impl NamedLock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the calling thread holds the lock
    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.holds = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.holds += 1;
                    return;
                }
                Some(_) => self.released.wait(&mut state),
            }
        }
    }

    /// Release one hold taken by `owner`; returns false if `owner` held nothing
    pub fn unlock_for(&self, owner: ThreadId) -> bool {
        let mut state = self.state.lock();
        if state.owner != Some(owner) || state.holds == 0 {
            return false;
        }
        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            self.released.notify_one();
        }
        true
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }
}

/// Process-scoped map from lock name to [`NamedLock`]
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: RwLock<HashMap<String, Arc<NamedLock>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the lock for `name`, creating it on first use
    pub fn get_or_create(&self, name: &str) -> Arc<NamedLock> {
        if let Some(lock) = self.locks.read().get(name) {
            return lock.clone();
        }
        let mut locks = self.locks.write();
        locks
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(lock = name, "Creating named lock");
                Arc::new(NamedLock::new(name))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }

    /// Forget every lock; called when a test ends
    pub fn clear(&self) {
        let mut locks = self.locks.write();
        debug!(count = locks.len(), "Clearing named lock registry");
        locks.clear();
    }
}
