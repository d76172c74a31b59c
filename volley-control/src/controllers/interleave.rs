use crate::compile::NodeId;
use crate::plan::{InterleaveConfig, InterleaveStyle};
use crate::traversal::{ControllerPolicy, Cursor, Env, Step};
use std::sync::Arc;
use volley_core::WorkItem;

/// Chooses where an interleave search starts and where it moves next
pub trait ChildSelector: Send {
    /// Start of a run; the cursor has been rewound and holds every child
    fn initialize(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {}

    /// Restart the search from the first candidate
    fn reset(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.reset();
    }

    /// The cursor has just moved past the child it pointed at
    fn advanced(&mut self, _cursor: &mut Cursor, _env: &mut Env<'_>) {}
}

/// Children in declaration order, optionally starting at a per-thread offset
#[derive(Debug, Clone, Copy, Default)]
pub struct InOrder {
    across_threads: bool,
}

impl ChildSelector for InOrder {
    fn initialize(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        if self.across_threads && !cursor.children.is_empty() {
            cursor.current = env.ctx.thread_num % cursor.children.len();
        }
    }
}

/// Yields one item per pass, moving to the next child on every pass
///
/// With [`InterleaveStyle::IgnoreSubControllers`] a child controller
/// contributes a single item per visit. With
/// [`InterleaveStyle::UseSubControllers`] it keeps the slot until its own
/// pass is over.
#[derive(Debug, Clone)]
pub struct InterleavePolicy<S = InOrder> {
    style: InterleaveStyle,
    selector: S,
    skip_next: bool,
    search_start: Option<NodeId>,
    still_same: bool,
    at_least_one: bool,
    /// Child that returned nothing on the previous visit, without a yield since
    last_null_child: Option<NodeId>,
}

impl InterleavePolicy<InOrder> {
    pub fn new(config: InterleaveConfig) -> Self {
        Self::with_selector(
            config.style,
            InOrder {
                across_threads: config.across_threads,
            },
        )
    }
}

impl<S: ChildSelector> InterleavePolicy<S> {
    pub fn with_selector(style: InterleaveStyle, selector: S) -> Self {
        Self {
            style,
            selector,
            skip_next: false,
            search_start: None,
            still_same: true,
            at_least_one: false,
            last_null_child: None,
        }
    }

    fn clear_search(&mut self) {
        self.skip_next = false;
        self.search_start = None;
        self.still_same = true;
        self.at_least_one = false;
        self.last_null_child = None;
    }
}

impl<S: ChildSelector> ControllerPolicy for InterleavePolicy<S> {
    fn initialize(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        self.clear_search();
        self.selector.initialize(cursor, env);
    }

    fn before_next(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Option<Step> {
        if self.skip_next {
            self.re_initialize(cursor, env);
            return Some(Step::Return(None));
        }
        None
    }

    fn set_current_element(
        &mut self,
        cursor: &mut Cursor,
        env: &mut Env<'_>,
        current: Option<NodeId>,
    ) -> Option<Step> {
        match self.search_start {
            None => self.search_start = current,
            Some(start) if Some(start) == current && !self.still_same => {
                // Wrapped around without finding anything to yield
                self.re_initialize(cursor, env);
                return Some(Step::Return(None));
            }
            Some(_) => {}
        }
        None
    }

    fn next_is_sampler(
        &mut self,
        cursor: &mut Cursor,
        env: &mut Env<'_>,
        item: Arc<WorkItem>,
    ) -> Step {
        self.skip_next = true;
        self.increment_current(cursor, env);
        Step::Return(Some(item))
    }

    fn child_yielded(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        self.at_least_one = true;
        self.last_null_child = None;
        match self.style {
            InterleaveStyle::IgnoreSubControllers => {
                self.increment_current(cursor, env);
                self.skip_next = true;
            }
            InterleaveStyle::UseSubControllers => self.search_start = None,
        }
    }

    fn current_returned_null(
        &mut self,
        cursor: &mut Cursor,
        env: &mut Env<'_>,
        child: NodeId,
        child_done: bool,
    ) {
        if child_done {
            cursor.remove_current();
            return;
        }
        match self.style {
            InterleaveStyle::UseSubControllers => self.increment_current(cursor, env),
            InterleaveStyle::IgnoreSubControllers => {
                // A child that ended its pass is asked again at once; twice
                // in a row with nothing in between means it is inert for now.
                if self.last_null_child == Some(child) {
                    self.last_null_child = None;
                    self.increment_current(cursor, env);
                } else {
                    self.last_null_child = Some(child);
                }
            }
        }
    }

    fn next_is_null(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) -> Step {
        self.selector.reset(cursor, env);
        Step::Retry
    }

    fn increment_current(&mut self, cursor: &mut Cursor, env: &mut Env<'_>) {
        if self.at_least_one {
            self.skip_next = true;
        }
        self.still_same = false;
        cursor.advance();
        self.selector.advanced(cursor, env);
    }

    fn re_initialize(&mut self, cursor: &mut Cursor, _env: &mut Env<'_>) {
        cursor.first = true;
        cursor.iter_count += 1;
        self.clear_search();
    }
}
