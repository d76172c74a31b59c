//! Controller policies
//!
//! Each controller kind is a [`ControllerPolicy`] over the shared traversal
//! protocol. Switch and weighted distribution reuse the interleave state
//! machine with a different child selection.

mod conditional;
mod critical_section;
mod foreach;
mod interleave;
mod loop_controller;
mod once_only;
mod random_order;
mod simple;
mod switch;
mod throughput;
mod weighted;

pub use conditional::{IfPolicy, WhilePolicy};
pub use critical_section::CriticalSectionPolicy;
pub use foreach::ForeachPolicy;
pub use interleave::{ChildSelector, InOrder, InterleavePolicy};
pub use loop_controller::LoopPolicy;
pub use once_only::OnceOnlyPolicy;
pub use random_order::RandomOrderPolicy;
pub use simple::SimplePolicy;
pub use switch::SwitchPolicy;
pub use throughput::ThroughputPolicy;
pub use weighted::{WeightedPolicy, WeightedSelector};

use crate::compile::{CompiledNode, ControllerKind};
use crate::generator::{IntegerGenerator, RandomIntegerGenerator};
use crate::traversal::{ControllerPolicy, PolicySetup};
use rand::Rng;

/// Fresh per-thread policy for a controller node
pub fn build_policy(
    node: &CompiledNode,
    kind: &ControllerKind,
    setup: &mut PolicySetup<'_>,
) -> Box<dyn ControllerPolicy> {
    match kind {
        ControllerKind::Simple => Box::new(SimplePolicy),
        ControllerKind::Loop(cfg) => Box::new(LoopPolicy::new(cfg.loops, cfg.continue_forever)),
        ControllerKind::Interleave(cfg) => Box::new(InterleavePolicy::new(cfg.clone())),
        ControllerKind::Switch(cfg) => Box::new(SwitchPolicy::new(cfg.selection.clone())),
        ControllerKind::WeightedDistribution(cfg) => {
            let generator: Box<dyn IntegerGenerator> = match &setup.options.generator_factory {
                Some(factory) => factory(node.id),
                None if cfg.seed != 0 => Box::new(RandomIntegerGenerator::seeded(cfg.seed)),
                None => Box::new(RandomIntegerGenerator::seeded(setup.rng.random())),
            };
            Box::new(WeightedPolicy::with_generator(generator))
        }
        ControllerKind::OnceOnly => Box::new(OnceOnlyPolicy::default()),
        ControllerKind::Throughput(cfg) => Box::new(ThroughputPolicy::new(cfg.clone())),
        ControllerKind::CriticalSection(cfg) => {
            Box::new(CriticalSectionPolicy::new(cfg.lock_name.clone()))
        }
        ControllerKind::Foreach(cfg) => Box::new(ForeachPolicy::new(cfg.clone())),
        ControllerKind::RandomOrder => Box::new(RandomOrderPolicy),
        ControllerKind::If(cfg) => Box::new(IfPolicy::new(cfg.clone())),
        ControllerKind::While(cfg) => Box::new(WhilePolicy::new(cfg.condition.clone())),
    }
}
