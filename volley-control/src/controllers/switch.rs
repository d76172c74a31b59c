use crate::compile::NodeId;
use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use tracing::debug;

/// Name of the child that catches selections matching no other child
const DEFAULT_CHILD: &str = "default";

/// Runs only the child the selection names
///
/// The selection may hold `${VAR}` placeholders. A number picks the child at
/// that index; anything else is matched against the child names, then
/// against a child called `Default`. Whatever matches nothing selects the
/// first child. A selected child that has finished for good contributes
/// nothing; the selection never shifts to its siblings.
#[derive(Debug, Clone)]
pub struct SwitchPolicy {
    selection: String,
}

impl SwitchPolicy {
    pub fn new(selection: impl Into<String>) -> Self {
        Self {
            selection: selection.into(),
        }
    }

    fn selected_index(&self, env: &Env<'_>) -> usize {
        let raw = env.substitute(&self.selection);
        let wanted = raw.trim();
        let children = &env.node().children;

        if let Ok(index) = wanted.parse::<i64>() {
            return match usize::try_from(index) {
                Ok(index) if index < children.len() => index,
                _ => {
                    debug!(node = %env.node().name, selection = %raw, "Switch index out of range, using first child");
                    0
                }
            };
        }

        if !wanted.is_empty() {
            let found = position_by_name(env, |name| name == wanted)
                .or_else(|| position_by_name(env, |name| name.eq_ignore_ascii_case(DEFAULT_CHILD)));
            if let Some(index) = found {
                return index;
            }
        }
        debug!(node = %env.node().name, selection = %raw, "Switch falls back to first child");
        0
    }
}

fn position_by_name(env: &Env<'_>, matches: impl Fn(&str) -> bool) -> Option<usize> {
    env.node()
        .children
        .iter()
        .position(|child| matches(&env.plan.node(*child).name))
}

impl ControllerPolicy for SwitchPolicy {
    fn before_next(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Option<Step> {
        if cursor.first {
            cursor.current = self.selected_index(env).min(cursor.children.len());
        }
        None
    }

    fn current_returned_null(
        &mut self,
        cursor: &mut Cursor,
        _env: &mut Env<'_>,
        _child: NodeId,
        _child_done: bool,
    ) {
        cursor.move_to_end();
    }

    fn increment_current(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.move_to_end();
    }
}
