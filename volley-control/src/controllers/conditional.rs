use crate::plan::IfConfig;
use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use volley_core::LAST_SAMPLE_OK;

/// Runs its children only while the condition holds
///
/// The condition is `true` when it reads `true` (any case) after `${VAR}`
/// substitution. It is checked on the first call of a pass, or before every
/// child with `evaluate_all`.
#[derive(Debug, Clone)]
pub struct IfPolicy {
    config: IfConfig,
}

impl IfPolicy {
    pub fn new(config: IfConfig) -> Self {
        Self { config }
    }
}

impl ControllerPolicy for IfPolicy {
    fn before_next(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Option<Step> {
        if !(self.config.evaluate_all || cursor.first) {
            return None;
        }
        let condition = env.substitute(&self.config.condition);
        if condition.trim().eq_ignore_ascii_case("true") {
            return None;
        }
        env.request_reinit_children();
        Some(self.next_is_null(cursor, env))
    }

    fn is_done(&self, _cursor: &Cursor) -> bool {
        false
    }
}

/// Repeats its children until the condition says stop
///
/// An empty condition stops at the end of a loop when the last sample
/// failed; `LAST` also refuses to start after a failed sample. Any other
/// condition stops when it reads `false` after substitution.
#[derive(Debug, Clone)]
pub struct WhilePolicy {
    condition: String,
    loop_count: u64,
}

impl WhilePolicy {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            loop_count: 0,
        }
    }

    /// Completed loops in the current run of the controller
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    fn end_of_loop(&self, at_loop_end: bool, env: &Env<'_>) -> bool {
        let condition = env.substitute(&self.condition);
        let condition = condition.trim();
        if (at_loop_end && condition.is_empty()) || condition.eq_ignore_ascii_case("LAST") {
            return env
                .ctx
                .vars
                .get(LAST_SAMPLE_OK)
                .is_some_and(|ok| ok.eq_ignore_ascii_case("false"));
        }
        condition.eq_ignore_ascii_case("false")
    }
}

impl ControllerPolicy for WhilePolicy {
    fn initialize(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {
        self.loop_count = 0;
    }

    fn before_next(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Option<Step> {
        if cursor.current != 0 || !self.end_of_loop(false, env) {
            return None;
        }
        self.re_initialize(cursor, env);
        self.loop_count = 0;
        Some(Step::Return(None))
    }

    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        self.re_initialize(cursor, env);
        if self.end_of_loop(true, env) {
            self.loop_count = 0;
            return Step::Return(None);
        }
        Step::Retry
    }

    fn re_initialize(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.re_initialize();
        self.loop_count += 1;
    }

    fn is_done(&self, _cursor: &Cursor) -> bool {
        false
    }
}
