mod common;

use common::{count, names, samplers, Harness};
use proptest::prelude::*;
use volley_control::{InterleaveStyle, PlanNode};

proptest! {
    #[test]
    fn once_only_children_run_in_first_iteration_only(loops in 1i64..15) {
        let plan = PlanNode::loop_controller("loop", loops, false).with_children([
            PlanNode::once_only("once").with_children(samplers(&["x", "y"])),
            PlanNode::sampler("z"),
        ]);
        let mut harness = Harness::new(&plan);
        let items = harness.drain(2);

        prop_assert_eq!(count(&items, "x"), 1);
        prop_assert_eq!(count(&items, "y"), 1);
        prop_assert_eq!(count(&items, "z"), loops as usize);
        prop_assert_eq!(&items[..3], &names(&["x", "y", "z"])[..]);
    }
}

#[test]
fn test_once_only_survives_outer_passes() {
    let plan = PlanNode::simple("root").with_children([
        PlanNode::sampler("login"),
        PlanNode::once_only("setup").with_children(samplers(&["create", "seed"])),
        PlanNode::sampler("browse"),
    ]);
    let mut harness = Harness::new(&plan);
    assert_eq!(
        harness.passes(3),
        vec![
            names(&["login", "create", "seed", "browse"]),
            names(&["login", "browse"]),
            names(&["login", "browse"]),
        ]
    );
}

#[test]
fn test_once_only_nested_in_inner_loop() {
    let plan = PlanNode::simple("root").with_child(
        PlanNode::loop_controller("inner", 3, true).with_children([
            PlanNode::once_only("once").with_child(PlanNode::sampler("first")),
            PlanNode::sampler("every"),
        ]),
    );
    let mut harness = Harness::new(&plan);
    assert_eq!(
        harness.passes(2),
        vec![
            names(&["first", "every", "every", "every"]),
            names(&["every", "every", "every"]),
        ]
    );
}

#[test]
fn test_spent_once_only_is_skipped_by_interleave() {
    let plan = PlanNode::simple("root").with_child(
        PlanNode::interleave("mix", InterleaveStyle::IgnoreSubControllers).with_children([
            PlanNode::once_only("once").with_child(PlanNode::sampler("a")),
            PlanNode::sampler("b"),
        ]),
    );
    let mut harness = Harness::new(&plan);
    assert_eq!(
        harness.passes(5),
        vec![
            names(&["a"]),
            names(&["b"]),
            names(&["b"]),
            names(&["b"]),
            names(&["b"]),
        ]
    );
}
