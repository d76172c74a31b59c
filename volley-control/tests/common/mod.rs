#![allow(dead_code)]

use std::sync::Arc;
use volley_control::{CompiledPlan, PlanNode, SharedState, Traversal, TraversalOptions};
use volley_core::{ThreadContext, Variables};

/// One virtual user driving a traversal by hand
pub struct Harness {
    pub traversal: Traversal,
    pub ctx: ThreadContext,
}

impl Harness {
    pub fn new(plan: &PlanNode) -> Self {
        Self::build(
            plan,
            TraversalOptions::default(),
            Arc::new(SharedState::new()),
            ThreadContext::default(),
        )
    }

    pub fn with_options(plan: &PlanNode, options: TraversalOptions) -> Self {
        Self::build(plan, options, Arc::new(SharedState::new()), ThreadContext::default())
    }

    pub fn with_vars(plan: &PlanNode, vars: Variables) -> Self {
        Self::build(
            plan,
            TraversalOptions::default(),
            Arc::new(SharedState::new()),
            ThreadContext::default().with_vars(vars),
        )
    }

    pub fn build(
        plan: &PlanNode,
        options: TraversalOptions,
        shared: Arc<SharedState>,
        ctx: ThreadContext,
    ) -> Self {
        let compiled = Arc::new(CompiledPlan::compile(plan).expect("plan compiles"));
        let traversal = Traversal::new(compiled, shared, &ctx, options);
        Self { traversal, ctx }
    }

    /// Name of the next item, `None` at the end of a pass
    pub fn next_name(&mut self) -> Option<String> {
        self.traversal
            .next(&mut self.ctx)
            .expect("traversal succeeds")
            .map(|item| item.name.clone())
    }

    /// Items up to the end of the current pass
    pub fn pass(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(name) = self.next_name() {
            out.push(name);
        }
        out
    }

    pub fn passes(&mut self, count: usize) -> Vec<Vec<String>> {
        (0..count).map(|_| self.pass()).collect()
    }

    /// Every item until the root is done, giving up after `max_passes`
    pub fn drain(&mut self, max_passes: usize) -> Vec<String> {
        let mut out = Vec::new();
        for _ in 0..max_passes {
            out.extend(self.pass());
            if self.traversal.is_done() {
                break;
            }
        }
        out
    }
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn samplers(items: &[&str]) -> Vec<PlanNode> {
    items.iter().map(|name| PlanNode::sampler(*name)).collect()
}

pub fn count(items: &[String], name: &str) -> usize {
    items.iter().filter(|i| *i == name).count()
}
