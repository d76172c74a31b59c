use crate::plan::{ThroughputConfig, ThroughputStyle};
use crate::shared::ThroughputCounter;
use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use tracing::trace;

/// Gates its children per pass of the enclosing controller
///
/// The decision is taken once, when the enclosing controller starts a pass.
/// Counters are per thread, or shared by every thread through
/// [`SharedState`](crate::shared::SharedState) when `per_thread` is off.
#[derive(Debug, Clone)]
pub struct ThroughputPolicy {
    config: ThroughputConfig,
    local: ThroughputCounter,
    run_this_time: bool,
    executions_seen: i64,
}

impl ThroughputPolicy {
    pub fn new(config: ThroughputConfig) -> Self {
        Self {
            config,
            local: ThroughputCounter::default(),
            run_this_time: false,
            executions_seen: 0,
        }
    }

    pub fn runs_this_time(&self) -> bool {
        self.run_this_time
    }
}

/// Whether the next iteration runs, given the counts so far
pub fn decide(style: ThroughputStyle, max_throughput: f64, executions: i64, iterations: i64) -> bool {
    match style {
        ThroughputStyle::ByNumber => executions < max_throughput as i64,
        ThroughputStyle::ByPercent => {
            (100.0 * executions as f64 + 50.0) / (iterations as f64 + 1.0) < max_throughput
        }
    }
}

fn record(counter: &mut ThroughputCounter, style: ThroughputStyle, max_throughput: f64) -> (bool, i64) {
    let run = decide(style, max_throughput, counter.executions, counter.iterations);
    if run {
        counter.executions += 1;
    }
    counter.iterations += 1;
    (run, counter.executions)
}

impl ControllerPolicy for ThroughputPolicy {
    fn iteration_start(&mut self, env: &mut Env<'_>) {
        let (style, max) = (self.config.style, self.config.max_throughput);
        let (run, executions) = if self.config.per_thread {
            record(&mut self.local, style, max)
        } else {
            env.shared
                .throughput
                .with_counter(env.node, |counter| record(counter, style, max))
        };
        self.run_this_time = run;
        self.executions_seen = executions;
        trace!(node = %env.node().name, run, executions, "Throughput decision");
    }

    fn before_next(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) -> Option<Step> {
        if !self.run_this_time {
            return Some(Step::Return(None));
        }
        None
    }

    fn is_done(&self, cursor: &Cursor) -> bool {
        if cursor.children.is_empty() {
            return true;
        }
        self.config.style == ThroughputStyle::ByNumber
            && self.executions_seen >= self.config.max_throughput as i64
            && cursor.current >= cursor.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_number_caps_executions() {
        let mut counter = ThroughputCounter::default();
        let runs: Vec<bool> = (0..5)
            .map(|_| record(&mut counter, ThroughputStyle::ByNumber, 2.0).0)
            .collect();
        assert_eq!(runs, vec![true, true, false, false, false]);
        assert_eq!(counter.executions, 2);
        assert_eq!(counter.iterations, 5);
    }

    #[test]
    fn test_by_percent_rounds_to_nearest() {
        let mut counter = ThroughputCounter::default();
        let runs: Vec<bool> = (0..6)
            .map(|_| record(&mut counter, ThroughputStyle::ByPercent, 33.33).0)
            .collect();
        assert_eq!(runs, vec![false, true, false, false, true, false]);
    }

    #[test]
    fn test_by_percent_full_and_zero() {
        let mut always = ThroughputCounter::default();
        let mut never = ThroughputCounter::default();
        for _ in 0..10 {
            assert!(record(&mut always, ThroughputStyle::ByPercent, 100.0).0);
            assert!(!record(&mut never, ThroughputStyle::ByPercent, 0.0).0);
        }
    }
}
