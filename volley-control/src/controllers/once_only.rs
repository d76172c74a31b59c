use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use tracing::debug;

/// Runs its children on the first pass only, for the rest of the thread's run
///
/// Once spent the controller stays inert rather than done, so enclosing
/// controllers keep their structure. Re-initialization does not rearm it.
#[derive(Debug, Clone, Default)]
pub struct OnceOnlyPolicy {
    spent: bool,
}

impl OnceOnlyPolicy {
    pub fn is_spent(&self) -> bool {
        self.spent
    }
}

impl ControllerPolicy for OnceOnlyPolicy {
    fn before_next(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) -> Option<Step> {
        if self.spent {
            return Some(Step::Return(None));
        }
        None
    }

    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        if !self.spent {
            debug!(node = %env.node().name, "Once-only controller spent");
        }
        self.spent = true;
        self.re_initialize(cursor, env);
        Step::Return(None)
    }
}
