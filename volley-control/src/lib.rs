//! Controller tree traversal for Volley
//!
//! A test plan is a tree of controllers and samplers. This crate turns a
//! [`PlanNode`] tree into the ordered stream of [`WorkItem`]s each virtual
//! user executes:
//!
//! 1. [`Resolver`] splices module targets and included plans into the tree,
//! 2. [`CompiledPlan::compile`] freezes it into an arena shared by all threads,
//! 3. each thread pulls items from its own [`Traversal`].
//!
//! ```
//! use std::sync::Arc;
//! use volley_control::{CompiledPlan, PlanNode, SharedState, Traversal, TraversalOptions};
//! use volley_core::ThreadContext;
//!
//! let plan = PlanNode::loop_controller("main", 2, false)
//!     .with_child(PlanNode::sampler("home"))
//!     .with_child(PlanNode::sampler("search"));
//! let compiled = Arc::new(CompiledPlan::compile(&plan).unwrap());
//!
//! let mut ctx = ThreadContext::default();
//! let mut traversal = Traversal::new(
//!     compiled,
//!     Arc::new(SharedState::new()),
//!     &ctx,
//!     TraversalOptions::default(),
//! );
//!
//! let mut names = Vec::new();
//! while let Some(item) = traversal.next(&mut ctx).unwrap() {
//!     names.push(item.name.clone());
//! }
//! assert_eq!(names, ["home", "search", "home", "search"]);
//! assert!(traversal.is_done());
//! ```
//!
//! [`WorkItem`]: volley_core::WorkItem

pub mod compile;
pub mod controllers;
pub mod error;
pub mod generator;
pub mod lock;
pub mod plan;
pub mod resolve;
pub mod shared;
pub mod traversal;

// Re-export commonly used types at the crate root
pub use compile::{CompiledNode, CompiledPlan, ControllerKind, NodeBody, NodeId};
pub use error::{ControlError, ControlResult, LoadError};
pub use generator::{
    calculate_probability, sequential_factory, GeneratorFactory, IntegerGenerator,
    RandomIntegerGenerator, SequentialIntegerGenerator,
};
pub use lock::{LockRegistry, NamedLock};
pub use plan::{InterleaveStyle, NodeKind, PlanNode, ThroughputStyle};
pub use resolve::{
    prune_disabled, FilePlanLoader, IncludeCache, PlanLoader, ResolutionReport, ResolveMode,
    Resolver, TreeProvider,
};
pub use shared::{SharedState, ThroughputCounter};
pub use traversal::{ControllerPolicy, Cursor, Env, Step, Traversal, TraversalOptions};
