use crate::traversal::{ControllerPolicy, Cursor, Env};
use rand::seq::SliceRandom;

/// Visits its children once per pass, in a fresh random order every pass
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderPolicy;

impl ControllerPolicy for RandomOrderPolicy {
    fn initialize(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        cursor.children.shuffle(&mut *env.rng);
    }

    fn re_initialize(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        cursor.re_initialize();
        cursor.children.shuffle(&mut *env.rng);
    }
}
