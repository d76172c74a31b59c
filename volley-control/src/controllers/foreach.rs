use crate::plan::ForeachConfig;
use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use tracing::debug;

/// Runs its children once per variable `{input}{sep}1`, `{input}{sep}2`, ...
///
/// Before each child the current value is published as `return_var`.
/// Iteration stops at the first missing index or after `end_index`.
#[derive(Debug, Clone)]
pub struct ForeachPolicy {
    config: ForeachConfig,
    loop_count: i64,
}

impl ForeachPolicy {
    pub fn new(config: ForeachConfig) -> Self {
        let loop_count = config.start_index;
        Self { config, loop_count }
    }

    fn variable(&self, index: i64) -> String {
        format!("{}{}{}", self.config.input_var, self.config.separator, index)
    }

    fn empty_list(&self, env: &Env<'_>) -> bool {
        !env.ctx.vars.contains(&self.variable(self.config.start_index + 1))
    }

    fn end_of_arguments(&self, env: &Env<'_>) -> bool {
        self.config.end_index.is_some_and(|end| self.loop_count >= end)
            || !env.ctx.vars.contains(&self.variable(self.loop_count + 1))
    }

    fn reset_loop_count(&mut self) {
        self.loop_count = self.config.start_index;
    }
}

impl ControllerPolicy for ForeachPolicy {
    fn initialize(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {
        self.reset_loop_count();
    }

    fn before_next(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Option<Step> {
        if self.empty_list(env) {
            debug!(node = %env.node().name, input = %self.config.input_var, "Nothing to iterate over");
            self.re_initialize(cursor, env);
            self.reset_loop_count();
            return Some(Step::Return(None));
        }
        if self.end_of_arguments(env) {
            self.reset_loop_count();
            return Some(Step::Return(None));
        }

        let name = self.variable(self.loop_count + 1);
        if let Some(value) = env.ctx.vars.get(&name).map(str::to_string) {
            env.ctx.vars.put(self.config.return_var.clone(), value);
        }
        None
    }

    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        self.re_initialize(cursor, env);
        if self.end_of_arguments(env) {
            self.reset_loop_count();
            return Step::Return(None);
        }
        Step::Retry
    }

    fn re_initialize(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.re_initialize();
        self.loop_count += 1;
    }
}
