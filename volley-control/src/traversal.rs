//! Per-thread traversal of a compiled plan
//!
//! A [`Traversal`] holds one [`Cursor`] and one [`ControllerPolicy`] per
//! controller node of a shared [`CompiledPlan`]. `next()` walks the tree with
//! an explicit stack instead of recursion: a controller either yields an
//! item, asks to be entered again ([`Step::Retry`]) or descends into a child
//! controller. The number of steps per call is bounded, so a plan that never
//! yields and never finishes fails with
//! [`ControlError::RunawayTraversal`] instead of spinning or overflowing.
//! With [`TraversalOptions::yield_idle_passes`] the root hands control back
//! after every empty pass, leaving the decision to the caller.

use crate::compile::{CompiledNode, CompiledPlan, NodeBody, NodeId};
use crate::controllers::build_policy;
use crate::error::{ControlError, ControlResult};
use crate::generator::GeneratorFactory;
use crate::shared::SharedState;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};
use volley_core::{substitute, ThreadContext, WorkItem};

/// Default bound on steps taken by one `next()` call
pub const DEFAULT_MAX_STEPS: usize = 100_000;

/// Traversal position of one controller on one thread
#[derive(Debug, Clone)]
pub struct Cursor {
    /// Live children; done children are removed for the rest of the run
    pub children: Vec<NodeId>,
    /// Index into `children`, never past `children.len()`
    pub current: usize,
    /// Completed passes since `initialize`
    pub iter_count: u64,
    pub done: bool,
    /// Set until the first call of a pass has been seen
    pub first: bool,
}

impl Cursor {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self {
            children,
            current: 0,
            iter_count: 0,
            done: false,
            first: true,
        }
    }

    pub fn current_element(&self) -> Option<NodeId> {
        self.children.get(self.current).copied()
    }

    pub fn advance(&mut self) {
        if self.current < self.children.len() {
            self.current += 1;
        }
    }

    pub fn move_to_end(&mut self) {
        self.current = self.children.len();
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Forget the current child for the rest of the run
    pub fn remove_current(&mut self) {
        if self.current < self.children.len() {
            self.children.remove(self.current);
        }
    }

    /// Start of a run: rewind and clear completion
    pub fn initialize(&mut self) {
        self.current = 0;
        self.iter_count = 0;
        self.done = false;
        self.first = true;
    }

    /// Start of another pass over the same children
    pub fn re_initialize(&mut self) {
        self.current = 0;
        self.iter_count += 1;
        self.first = true;
    }
}

/// Outcome of a policy hook
#[derive(Debug, Clone)]
pub enum Step {
    /// Finish this controller's call with an item or "no item"
    Return(Option<Arc<WorkItem>>),
    /// Enter the same controller again
    Retry,
    /// Ask the given child controller for an item
    Descend(NodeId),
}

/// What a policy hook may touch besides its own cursor
pub struct Env<'a> {
    pub plan: &'a CompiledPlan,
    pub shared: &'a SharedState,
    pub ctx: &'a mut ThreadContext,
    pub rng: &'a mut StdRng,
    pub node: NodeId,
    reinit_children: bool,
}

impl Env<'_> {
    pub fn node(&self) -> &CompiledNode {
        self.plan.node(self.node)
    }

    /// Expand `${VAR}` placeholders against the thread variables
    pub fn substitute(&self, text: &str) -> String {
        substitute(text, &self.ctx.vars)
    }

    /// Re-initialize every child controller once the current hook returns
    pub fn request_reinit_children(&mut self) {
        self.reinit_children = true;
    }
}

/// Behaviour of one controller kind, layered on the shared traversal protocol
///
/// Every hook has the behaviour of a plain sequential controller by default;
/// concrete controllers override the ones they need.
pub trait ControllerPolicy: Send {
    /// Start of a run; the cursor has already been rewound
    fn initialize(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {}

    /// Runs before anything else on every call; `Some` short-circuits it
    fn before_next(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) -> Option<Step> {
        None
    }

    /// Sees the element about to be visited (`None` past the end)
    fn set_current_element(
        &mut self,
        _cursor: &mut Cursor,
        _env: &mut Env<'_>,
        _current: Option<NodeId>,
    ) -> Option<Step> {
        None
    }

    fn next_is_sampler(
        &mut self,
        cursor: &mut Cursor,
        env: &mut Env<'_>,
        item: Arc<WorkItem>,
    ) -> Step {
        self.increment_current(cursor, env);
        Step::Return(Some(item))
    }

    /// A child controller produced an item
    fn child_yielded(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {}

    /// A child controller produced nothing; the controller is entered again afterwards
    fn current_returned_null(
        &mut self,
        cursor: &mut Cursor,
        env: &mut Env<'_>,
        _child: NodeId,
        child_done: bool,
    ) {
        if child_done {
            cursor.remove_current();
        } else {
            self.increment_current(cursor, env);
        }
    }

    /// The cursor is past the last child
    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        self.re_initialize(cursor, env);
        Step::Return(None)
    }

    fn increment_current(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.advance();
    }

    fn re_initialize(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.re_initialize();
    }

    fn is_done(&self, cursor: &Cursor) -> bool {
        cursor.done
    }

    /// Every child has finished for good; the controller is now done
    fn children_exhausted(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {}

    /// The enclosing controller started a pass
    fn iteration_start(&mut self, _env: &mut Env<'_>) {}

    /// The owning virtual user is going away
    fn thread_finished(&mut self, _node: &CompiledNode) {}
}

/// Tuning for a [`Traversal`]
#[derive(Clone)]
pub struct TraversalOptions {
    /// Steps one `next()` call may take before giving up
    pub max_steps: usize,
    /// Base seed for per-thread randomness; thread `n` uses `seed + n`
    pub seed: Option<u64>,
    /// Overrides the generator of every weighted-distribution controller
    pub generator_factory: Option<GeneratorFactory>,
    /// Return `None` once a whole pass of the root yielded nothing, instead
    /// of starting the next pass within the same call
    pub yield_idle_passes: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
            generator_factory: None,
            yield_idle_passes: false,
        }
    }
}

impl fmt::Debug for TraversalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalOptions")
            .field("max_steps", &self.max_steps)
            .field("seed", &self.seed)
            .field("generator_factory", &self.generator_factory.is_some())
            .field("yield_idle_passes", &self.yield_idle_passes)
            .finish()
    }
}

/// State needed by [`build_policy`] beyond the node itself
pub struct PolicySetup<'a> {
    pub options: &'a TraversalOptions,
    pub rng: &'a mut StdRng,
}

struct Slot {
    cursor: Cursor,
    policy: Box<dyn ControllerPolicy>,
}

/// One virtual user's walk over a shared plan
pub struct Traversal {
    plan: Arc<CompiledPlan>,
    shared: Arc<SharedState>,
    slots: Vec<Option<Slot>>,
    rng: StdRng,
    options: TraversalOptions,
    initialized: bool,
    root_iterations: u64,
    idle: bool,
    finished: bool,
}

impl Traversal {
    pub fn new(
        plan: Arc<CompiledPlan>,
        shared: Arc<SharedState>,
        ctx: &ThreadContext,
        options: TraversalOptions,
    ) -> Self {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(ctx.thread_num as u64)),
            None => StdRng::from_os_rng(),
        };

        let mut slots = Vec::with_capacity(plan.len());
        for node in plan.iter() {
            let slot = match &node.body {
                NodeBody::Sampler(_) => None,
                NodeBody::Controller(kind) => {
                    let mut setup = PolicySetup {
                        options: &options,
                        rng: &mut rng,
                    };
                    Some(Slot {
                        cursor: Cursor::new(node.children.clone()),
                        policy: build_policy(node, kind, &mut setup),
                    })
                }
            };
            slots.push(slot);
        }

        Self {
            plan,
            shared,
            slots,
            rng,
            options,
            initialized: false,
            root_iterations: 0,
            idle: false,
            finished: false,
        }
    }

    pub fn plan(&self) -> &CompiledPlan {
        &self.plan
    }

    /// Main-loop iterations started so far
    pub fn iterations(&self) -> u64 {
        self.root_iterations
    }

    /// Reset every controller for the start of a run
    pub fn initialize(&mut self, ctx: &mut ThreadContext) -> ControlResult<()> {
        let root = self.plan.root();
        self.initialize_subtree(root, ctx)?;
        self.initialized = true;
        self.root_iterations = 0;
        debug!(thread = %ctx.thread_name, nodes = self.plan.len(), "Traversal initialized");
        Ok(())
    }

    /// Whether the last `next()` gave up on a pass that yielded nothing
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Whether the root controller has finished for good
    pub fn is_done(&self) -> bool {
        self.controller_done(self.plan.root())
    }

    /// Next work item, or `None` at the end of a pass
    pub fn next(&mut self, ctx: &mut ThreadContext) -> ControlResult<Option<Arc<WorkItem>>> {
        if !self.initialized {
            self.initialize(ctx)?;
        }

        let mut stack = vec![self.plan.root()];
        let mut returned: Option<(NodeId, Option<Arc<WorkItem>>)> = None;
        let mut steps = 0usize;
        let passes_before = self.root_iterations;
        self.idle = false;

        while let Some(&top) = stack.last() {
            // A call that has started two passes has seen one of them end empty
            if self.options.yield_idle_passes && self.root_iterations >= passes_before + 2 {
                trace!(thread = %ctx.thread_name, iteration = ctx.iteration, "Pass yielded nothing");
                self.idle = true;
                return Ok(None);
            }
            steps += 1;
            if steps > self.options.max_steps {
                let name = self.plan.node(top).name.clone();
                error!(
                    thread = %ctx.thread_name,
                    node = %name,
                    steps = self.options.max_steps,
                    "Traversal made no progress, giving up"
                );
                return Err(ControlError::RunawayTraversal {
                    steps: self.options.max_steps,
                    node: name,
                });
            }

            let step = match returned.take() {
                Some((child, result)) => self.child_returned(top, child, result, ctx)?,
                None => self.enter(top, ctx)?,
            };

            match step {
                Step::Return(result) => {
                    stack.pop();
                    if stack.is_empty() {
                        if let Some(item) = &result {
                            trace!(thread = %ctx.thread_name, item = %item.name, "Yielding work item");
                        }
                        return Ok(result);
                    }
                    returned = Some((top, result));
                }
                Step::Retry => {}
                Step::Descend(child) => stack.push(child),
            }
        }
        Ok(None)
    }

    /// Release anything held on behalf of this thread; safe to call twice
    pub fn thread_finished(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let plan = self.plan.clone();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(slot) = slot {
                slot.policy.thread_finished(plan.node(NodeId(index as u32)));
            }
        }
    }

    fn enter(&mut self, id: NodeId, ctx: &mut ThreadContext) -> ControlResult<Step> {
        if let Some(step) = self.with_policy(id, ctx, |p, c, env| p.before_next(c, env))? {
            return Ok(step);
        }

        if self.slot(id)?.cursor.first {
            self.slot_mut(id)?.cursor.first = false;
            self.fire_iteration_start(id, ctx)?;
        }

        if self.controller_done(id) {
            return Ok(Step::Return(None));
        }

        if self.slot(id)?.cursor.children.is_empty() {
            self.slot_mut(id)?.cursor.done = true;
            self.with_policy(id, ctx, |p, c, env| p.children_exhausted(c, env))?;
            return Ok(Step::Return(None));
        }
        let current = self.slot(id)?.cursor.current_element();

        if let Some(step) =
            self.with_policy(id, ctx, |p, c, env| p.set_current_element(c, env, current))?
        {
            return Ok(step);
        }

        match current {
            None => self.with_policy(id, ctx, |p, c, env| p.next_is_null(c, env)),
            Some(child) => match &self.plan.node(child).body {
                NodeBody::Sampler(item) => {
                    let item = item.clone();
                    self.with_policy(id, ctx, move |p, c, env| p.next_is_sampler(c, env, item))
                }
                NodeBody::Controller(_) => Ok(Step::Descend(child)),
            },
        }
    }

    fn child_returned(
        &mut self,
        id: NodeId,
        child: NodeId,
        result: Option<Arc<WorkItem>>,
        ctx: &mut ThreadContext,
    ) -> ControlResult<Step> {
        match result {
            Some(item) => {
                self.with_policy(id, ctx, |p, c, env| p.child_yielded(c, env))?;
                Ok(Step::Return(Some(item)))
            }
            None => {
                let child_done = self.controller_done(child);
                self.with_policy(id, ctx, |p, c, env| {
                    p.current_returned_null(c, env, child, child_done)
                })?;
                Ok(Step::Retry)
            }
        }
    }

    fn fire_iteration_start(&mut self, id: NodeId, ctx: &mut ThreadContext) -> ControlResult<()> {
        if id == self.plan.root() {
            self.root_iterations += 1;
            ctx.iteration = self.root_iterations;
            debug!(thread = %ctx.thread_name, iteration = ctx.iteration, "Starting iteration");
        }
        let plan = self.plan.clone();
        for listener in &plan.node(id).listeners {
            self.with_policy(*listener, ctx, |p, _, env| p.iteration_start(env))?;
        }
        Ok(())
    }

    fn initialize_subtree(&mut self, id: NodeId, ctx: &mut ThreadContext) -> ControlResult<()> {
        if self.plan.node(id).is_sampler() {
            return Ok(());
        }
        self.slot_mut(id)?.cursor.initialize();
        self.with_policy(id, ctx, |p, c, env| p.initialize(c, env))?;
        self.initialize_children(id, ctx)
    }

    fn initialize_children(&mut self, id: NodeId, ctx: &mut ThreadContext) -> ControlResult<()> {
        let children = self.slot(id)?.cursor.children.clone();
        for child in children {
            self.initialize_subtree(child, ctx)?;
        }
        Ok(())
    }

    fn controller_done(&self, id: NodeId) -> bool {
        match self.slots.get(id.index()) {
            Some(Some(slot)) => slot.policy.is_done(&slot.cursor),
            _ => false,
        }
    }

    fn slot(&self, id: NodeId) -> ControlResult<&Slot> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| missing_slot(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> ControlResult<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| missing_slot(id))
    }

    /// Run a hook of controller `id` with its cursor and an [`Env`]
    fn with_policy<R>(
        &mut self,
        id: NodeId,
        ctx: &mut ThreadContext,
        f: impl FnOnce(&mut dyn ControllerPolicy, &mut Cursor, &mut Env<'_>) -> R,
    ) -> ControlResult<R> {
        let mut slot = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| missing_slot(id))?;

        let (result, reinit_children) = {
            let mut env = Env {
                plan: &self.plan,
                shared: &self.shared,
                ctx: &mut *ctx,
                rng: &mut self.rng,
                node: id,
                reinit_children: false,
            };
            let result = f(slot.policy.as_mut(), &mut slot.cursor, &mut env);
            (result, env.reinit_children)
        };
        self.slots[id.index()] = Some(slot);

        if reinit_children {
            self.initialize_children(id, ctx)?;
        }
        Ok(result)
    }
}

impl Drop for Traversal {
    fn drop(&mut self) {
        self.thread_finished();
    }
}

fn missing_slot(id: NodeId) -> ControlError {
    ControlError::InvalidPlan(format!("node {} has no controller state", id))
}
