use super::interleave::{ChildSelector, InterleavePolicy};
use crate::compile::NodeId;
use crate::generator::IntegerGenerator;
use crate::plan::InterleaveStyle;
use crate::traversal::{Cursor, Env};
use std::collections::HashMap;
use tracing::debug;

/// Interleave that picks each pass's child at random, proportionally to weight
pub type WeightedPolicy = InterleavePolicy<WeightedSelector>;

impl InterleavePolicy<WeightedSelector> {
    pub fn with_generator(generator: Box<dyn IntegerGenerator>) -> Self {
        Self::with_selector(
            InterleaveStyle::IgnoreSubControllers,
            WeightedSelector {
                generator,
                weights: HashMap::new(),
                cumulative: None,
            },
        )
    }
}

/// Weighted random child selection
///
/// Weights are read when the run starts, after `${VAR}` substitution.
/// Children whose weight is not a positive integer are dropped.
pub struct WeightedSelector {
    generator: Box<dyn IntegerGenerator>,
    weights: HashMap<NodeId, i64>,
    /// Sum of live weights, cached together with the live child count
    cumulative: Option<(usize, i64)>,
}

impl WeightedSelector {
    fn cumulative(&mut self, cursor: &Cursor) -> i64 {
        match self.cumulative {
            Some((count, total)) if count == cursor.children.len() => total,
            _ => {
                let total = cursor
                    .children
                    .iter()
                    .map(|c| self.weights.get(c).copied().unwrap_or(0))
                    .sum();
                self.cumulative = Some((cursor.children.len(), total));
                total
            }
        }
    }

    fn determine(&mut self, cursor: &Cursor) -> usize {
        let total = self.cumulative(cursor);
        if total <= 0 {
            return 0;
        }
        let mut remaining = i64::from(self.generator.next_int(total.min(u32::MAX as i64) as u32));
        for (index, child) in cursor.children.iter().enumerate() {
            let weight = self.weights.get(child).copied().unwrap_or(0);
            if weight > remaining {
                return index;
            }
            remaining -= weight;
        }
        0
    }
}

/// Weight of a child, 0 when missing or not an integer
pub(crate) fn effective_weight(raw: Option<&str>, env: &Env<'_>) -> i64 {
    raw.map(|w| env.substitute(w))
        .and_then(|w| w.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

impl ChildSelector for WeightedSelector {
    fn initialize(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        self.weights.clear();
        self.cumulative = None;

        let mut live = Vec::new();
        for &child in &env.node().children {
            let weight = effective_weight(env.plan.node(child).weight.as_deref(), env);
            if weight > 0 {
                self.weights.insert(child, weight);
                live.push(child);
            }
        }
        if live.len() < env.node().children.len() {
            debug!(
                node = %env.node().name,
                dropped = env.node().children.len() - live.len(),
                "Ignoring children without a positive weight"
            );
        }
        cursor.children = live;
        cursor.current = self.determine(cursor);
    }

    fn reset(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.current = self.determine(cursor);
    }

    fn advanced(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.current = self.determine(cursor);
    }
}
