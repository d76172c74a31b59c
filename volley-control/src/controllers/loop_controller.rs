use crate::traversal::{ControllerPolicy, Cursor, Env, Step};

/// Repeats its children a fixed number of times, or forever when negative
#[derive(Debug, Clone)]
pub struct LoopPolicy {
    loops: i64,
    continue_forever: bool,
    loop_count: i64,
}

impl LoopPolicy {
    pub fn new(loops: i64, continue_forever: bool) -> Self {
        Self {
            loops,
            continue_forever,
            loop_count: 0,
        }
    }

    fn end_of_loop(&self) -> bool {
        self.loops >= 0 && self.loop_count >= self.loops
    }

    /// Past the bound: finish for good, or rearm for the next outer pass
    fn finish(&mut self, cursor: &mut Cursor) {
        if self.continue_forever {
            self.loop_count = 0;
        } else {
            cursor.done = true;
        }
    }
}

impl ControllerPolicy for LoopPolicy {
    fn initialize(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {
        self.loop_count = 0;
    }

    fn before_next(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) -> Option<Step> {
        if self.end_of_loop() {
            if !self.continue_forever {
                cursor.done = true;
            }
            return Some(Step::Return(None));
        }
        None
    }

    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        self.re_initialize(cursor, env);
        if self.end_of_loop() {
            self.finish(cursor);
            return Step::Return(None);
        }
        Step::Retry
    }

    fn re_initialize(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.re_initialize();
        self.loop_count += 1;
    }
}
