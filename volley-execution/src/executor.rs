//! Sample executor seam between the traversal and the system under test

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use volley_core::{ThreadContext, WorkItem};

/// Result of executing one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl SampleOutcome {
    pub fn ok(elapsed: Duration) -> Self {
        Self {
            success: true,
            message: None,
            elapsed,
        }
    }

    pub fn failed(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            elapsed,
        }
    }
}

/// Executes the work items a virtual user pulls from its traversal
///
/// One executor is shared by every user of a thread group, so implementations
/// must be thread safe. The outcome's `success` becomes the user's
/// `LAST_SAMPLE_OK` variable.
pub trait SampleExecutor: Send + Sync {
    fn execute(&self, item: &WorkItem, ctx: &ThreadContext) -> SampleOutcome;
}

/// Logs each item instead of sending it anywhere
#[derive(Debug, Clone, Default)]
pub struct LoggingExecutor {
    think_time: Duration,
}

impl LoggingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause after every sample
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }
}

impl SampleExecutor for LoggingExecutor {
    fn execute(&self, item: &WorkItem, ctx: &ThreadContext) -> SampleOutcome {
        let started = Instant::now();
        info!(
            thread = %ctx.thread_name,
            iteration = ctx.iteration,
            sampler = %item.name,
            "Sample"
        );
        for (key, value) in &item.properties {
            debug!(sampler = %item.name, %key, %value, "Sampler property");
        }
        if !self.think_time.is_zero() {
            thread::sleep(self.think_time);
        }
        SampleOutcome::ok(started.elapsed())
    }
}

/// One executed sample as seen by a [`RecordingExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub thread_num: usize,
    pub thread_name: String,
    pub iteration: u64,
    pub item: String,
}

/// Records every sample in execution order; handy for asserting sequences
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    records: Mutex<Vec<SampleRecord>>,
    failing: HashSet<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report failure for items with these names
    pub fn failing_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn records(&self) -> Vec<SampleRecord> {
        self.records.lock().clone()
    }

    /// Item names executed by one thread, in order
    pub fn items_for(&self, thread_num: usize) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.thread_num == thread_num)
            .map(|r| r.item.clone())
            .collect()
    }

    pub fn count(&self, item: &str) -> usize {
        self.records.lock().iter().filter(|r| r.item == item).count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl SampleExecutor for RecordingExecutor {
    fn execute(&self, item: &WorkItem, ctx: &ThreadContext) -> SampleOutcome {
        self.records.lock().push(SampleRecord {
            thread_num: ctx.thread_num,
            thread_name: ctx.thread_name.clone(),
            iteration: ctx.iteration,
            item: item.name.clone(),
        });
        if self.failing.contains(&item.name) {
            SampleOutcome::failed(format!("{} is configured to fail", item.name), Duration::ZERO)
        } else {
            SampleOutcome::ok(Duration::ZERO)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_executor_keeps_order_and_failures() {
        let executor = RecordingExecutor::new().failing_on(["pay"]);
        let mut ctx = ThreadContext::new(1, "group 1-2");
        ctx.iteration = 3;

        assert!(executor.execute(&WorkItem::new("cart"), &ctx).success);
        let outcome = executor.execute(&WorkItem::new("pay"), &ctx);
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("pay"));

        assert_eq!(executor.items_for(1), vec!["cart", "pay"]);
        assert!(executor.items_for(0).is_empty());
        assert_eq!(executor.records()[1].iteration, 3);
        assert_eq!(executor.len(), 2);
    }

    #[test]
    fn test_logging_executor_always_succeeds() {
        let executor = LoggingExecutor::new();
        let item = WorkItem::new("home").with_property("url", "/");
        assert!(executor.execute(&item, &ThreadContext::default()).success);
    }
}
