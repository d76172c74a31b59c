mod common;

use common::Harness;
use volley_control::{InterleaveStyle, PlanNode, ThroughputStyle, TraversalOptions};
use volley_core::Variables;

/// A plan mixing every controller kind that keeps per-thread state
fn storefront() -> PlanNode {
    PlanNode::loop_controller("main", 12, false).with_children([
        PlanNode::once_only("setup").with_child(PlanNode::sampler("login")),
        PlanNode::interleave("landing", InterleaveStyle::UseSubControllers).with_children([
            PlanNode::sampler("home"),
            PlanNode::simple("search").with_children([
                PlanNode::sampler("query"),
                PlanNode::sampler("results"),
            ]),
        ]),
        PlanNode::weighted("browse").with_children([
            PlanNode::sampler("category").with_weight("5"),
            PlanNode::sampler("product").with_weight("3"),
            PlanNode::random_order("compare")
                .with_children([PlanNode::sampler("left"), PlanNode::sampler("right")])
                .with_weight("2"),
        ]),
        PlanNode::switch("pick", "${CHOICE}")
            .with_children([PlanNode::sampler("wishlist"), PlanNode::sampler("reviews")]),
        PlanNode::throughput("checkout", ThroughputStyle::ByPercent, 40.0, true).with_child(
            PlanNode::critical_section("stock", "inventory").with_children([
                PlanNode::sampler("reserve"),
                PlanNode::sampler("pay"),
            ]),
        ),
        PlanNode::foreach("each", "coupon", "code").with_child(PlanNode::sampler("apply")),
    ])
}

fn run(seed: u64) -> Vec<String> {
    let vars: Variables = [("CHOICE", "1"), ("coupon_1", "A"), ("coupon_2", "B")]
        .into_iter()
        .collect();
    let options = TraversalOptions {
        seed: Some(seed),
        ..Default::default()
    };
    let mut harness = Harness::with_options(&storefront(), options);
    harness.ctx.vars = vars;
    harness.drain(2)
}

#[test]
fn test_same_seed_gives_same_sequence() {
    let first = run(42);
    assert!(!first.is_empty());
    assert_eq!(first, run(42));
}

#[test]
fn test_sequence_shape() {
    let items = run(7);
    let count = |name: &str| items.iter().filter(|i| *i == name).count();

    assert_eq!(count("login"), 1);
    assert_eq!(count("reviews"), 12);
    assert_eq!(count("wishlist"), 0);
    assert_eq!(count("apply"), 24);
    // 40% of 12 iterations
    assert_eq!(count("reserve"), 5);
    assert_eq!(count("pay"), 5);
}
