//! One virtual user: a thread context, a traversal and a sample loop

use crate::error::ExecutionError;
use crate::executor::SampleExecutor;
use crate::stop::StopSignal;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use volley_control::Traversal;
use volley_core::{ThreadContext, LAST_SAMPLE_OK};

/// Pause after an empty pass while waiting for the run duration to pass
const IDLE_PAUSE: Duration = Duration::from_millis(5);

/// What one virtual user did during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub thread_num: usize,
    pub thread_name: String,
    pub iterations: u64,
    pub samples: u64,
    pub failures: u64,
    pub duration_ms: u64,
    /// Set when the user stopped on an error instead of running out of work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UserSummary {
    pub(crate) fn new(ctx: &ThreadContext) -> Self {
        Self {
            thread_num: ctx.thread_num,
            thread_name: ctx.thread_name.clone(),
            ..Default::default()
        }
    }

    /// Summary for a user whose thread died before reporting
    pub fn panicked(thread_num: usize, thread_name: impl Into<String>) -> Self {
        Self {
            thread_num,
            thread_name: thread_name.into(),
            error: Some("virtual user panicked".to_string()),
            ..Default::default()
        }
    }
}

pub struct VirtualUser {
    ctx: ThreadContext,
    traversal: Traversal,
    executor: Arc<dyn SampleExecutor>,
    stop: StopSignal,
    deadline: Option<Instant>,
    idle_limit: Option<u64>,
}

impl VirtualUser {
    pub fn new(
        ctx: ThreadContext,
        traversal: Traversal,
        executor: Arc<dyn SampleExecutor>,
        stop: StopSignal,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            ctx,
            traversal,
            executor,
            stop,
            deadline,
            idle_limit: None,
        }
    }

    /// Give up after `passes` consecutive empty passes
    pub fn with_idle_limit(mut self, passes: u64) -> Self {
        self.idle_limit = Some(passes);
        self
    }

    /// Pull and execute items until the main loop is done, the run is
    /// stopped or the traversal fails
    pub fn run(mut self) -> UserSummary {
        let started = Instant::now();
        let mut summary = UserSummary::new(&self.ctx);
        info!(thread = %self.ctx.thread_name, "Virtual user started");
        let mut idle_passes = 0u64;

        loop {
            if self.stop.is_stopped() {
                debug!(thread = %self.ctx.thread_name, "Stop requested");
                break;
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(thread = %self.ctx.thread_name, "Run duration reached");
                break;
            }

            match self.traversal.next(&mut self.ctx) {
                Ok(Some(item)) => {
                    idle_passes = 0;
                    let outcome = self.executor.execute(&item, &self.ctx);
                    self.ctx.vars.put(LAST_SAMPLE_OK, outcome.success.to_string());
                    summary.samples += 1;
                    if !outcome.success {
                        summary.failures += 1;
                        debug!(
                            thread = %self.ctx.thread_name,
                            sampler = %item.name,
                            message = outcome.message.as_deref().unwrap_or(""),
                            "Sample failed"
                        );
                    }
                }
                Ok(None) if self.traversal.is_done() => break,
                Ok(None) if self.traversal.is_idle() => {
                    idle_passes += 1;
                    if self.idle_limit.is_some_and(|limit| idle_passes >= limit) {
                        let e = ExecutionError::IdlePlan { passes: idle_passes };
                        error!(thread = %self.ctx.thread_name, error = %e, "Virtual user stopped");
                        summary.error = Some(e.to_string());
                        break;
                    }
                    if self.deadline.is_some() && !self.stop.sleep(IDLE_PAUSE) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(thread = %self.ctx.thread_name, error = %e, "Virtual user stopped");
                    summary.error = Some(e.to_string());
                    break;
                }
            }
        }

        self.traversal.thread_finished();
        summary.iterations = self.traversal.iterations();
        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            thread = %self.ctx.thread_name,
            iterations = summary.iterations,
            samples = summary.samples,
            failures = summary.failures,
            "Virtual user finished"
        );
        summary
    }
}
