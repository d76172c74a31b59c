mod common;

use common::{names, samplers, Harness};
use volley_control::plan::IfConfig;
use volley_control::{NodeKind, PlanNode};
use volley_core::{Variables, LAST_SAMPLE_OK};

fn set_last_sample(harness: &mut Harness, ok: bool) {
    harness.ctx.vars.put(LAST_SAMPLE_OK, ok.to_string());
}

#[test]
fn test_false_condition_around_endless_loop_yields_nothing() {
    let plan = PlanNode::loop_controller("loop", 1, false).with_child(
        PlanNode::if_controller("if", "false").with_child(
            PlanNode::while_controller("while", "true").with_child(PlanNode::sampler("sample1")),
        ),
    );
    let mut harness = Harness::new(&plan);
    assert!(harness.drain(5).is_empty());
    assert!(harness.traversal.is_done());
}

#[test]
fn test_true_condition_runs_children() {
    let plan = PlanNode::loop_controller("loop", 2, false).with_children([
        PlanNode::sampler("sample1"),
        PlanNode::new(
            "if",
            NodeKind::If(IfConfig {
                condition: "true".to_string(),
                evaluate_all: true,
            }),
        )
        .with_children(samplers(&["sample2", "sample3"])),
    ]);
    let mut harness = Harness::new(&plan);
    assert_eq!(
        harness.drain(2),
        names(&["sample1", "sample2", "sample3", "sample1", "sample2", "sample3"])
    );
}

#[test]
fn test_evaluate_all_checks_before_every_child() {
    let plan = PlanNode::simple("root").with_children([
        PlanNode::sampler("sample1"),
        PlanNode::new(
            "if",
            NodeKind::If(IfConfig {
                condition: "${RUN}".to_string(),
                evaluate_all: true,
            }),
        )
        .with_children(samplers(&["sample2", "sample3", "sample4"])),
    ]);
    let vars: Variables = [("RUN", "true")].into_iter().collect();
    let mut harness = Harness::with_vars(&plan, vars);

    for _ in 0..2 {
        let mut pass = Vec::new();
        while let Some(name) = harness.next_name() {
            match name.as_str() {
                "sample1" => harness.ctx.vars.put("RUN", "true"),
                "sample3" => harness.ctx.vars.put("RUN", "false"),
                _ => {}
            }
            pass.push(name);
        }
        assert_eq!(pass, names(&["sample1", "sample2", "sample3"]));
    }
}

#[test]
fn test_condition_is_checked_once_per_pass_by_default() {
    let plan = PlanNode::simple("root").with_child(
        PlanNode::if_controller("if", "${RUN}").with_children(samplers(&["a", "b", "c"])),
    );
    let vars: Variables = [("RUN", "TRUE")].into_iter().collect();
    let mut harness = Harness::with_vars(&plan, vars);

    assert_eq!(harness.next_name().as_deref(), Some("a"));
    harness.ctx.vars.put("RUN", "false");
    assert_eq!(harness.next_name().as_deref(), Some("b"));
    assert_eq!(harness.next_name().as_deref(), Some("c"));
    assert_eq!(harness.next_name(), None);
    assert!(harness.pass().is_empty());
}

fn while_plan(condition: &str) -> PlanNode {
    PlanNode::simple("controller").with_children([
        PlanNode::while_controller("while", condition)
            .with_children(samplers(&["one", "two", "three"])),
        PlanNode::sampler("four"),
    ])
}

fn run_while_prev_ok(condition: &str) {
    let mut harness = Harness::new(&while_plan(condition));
    set_last_sample(&mut harness, true);

    for expected in ["one", "two", "three", "one", "two", "three", "one"] {
        assert_eq!(harness.next_name().as_deref(), Some(expected));
    }
    set_last_sample(&mut harness, false);
    assert_eq!(harness.next_name().as_deref(), Some("two"));
    assert_eq!(harness.next_name().as_deref(), Some("three"));

    set_last_sample(&mut harness, true);
    for expected in ["one", "two", "three"] {
        assert_eq!(harness.next_name().as_deref(), Some(expected));
    }

    set_last_sample(&mut harness, false);
    assert_eq!(harness.next_name().as_deref(), Some("four"));
    assert_eq!(harness.next_name(), None);

    set_last_sample(&mut harness, true);
    assert_eq!(harness.next_name().as_deref(), Some("one"));
}

#[test]
fn test_while_blank_loops_until_sample_fails() {
    run_while_prev_ok("");
}

#[test]
fn test_while_last_loops_until_sample_fails() {
    run_while_prev_ok("LAST");
}

#[test]
fn test_while_expression_loops_until_false() {
    let mut harness = Harness::new(&while_plan("${COND}"));
    harness.ctx.vars.put("COND", "X");
    for expected in ["one", "two", "three", "one", "two", "three", "one"] {
        assert_eq!(harness.next_name().as_deref(), Some(expected));
    }
    harness.ctx.vars.put("COND", "false");
    assert_eq!(harness.next_name().as_deref(), Some("two"));
    assert_eq!(harness.next_name().as_deref(), Some("three"));
    assert_eq!(harness.next_name().as_deref(), Some("four"));
    assert_eq!(harness.next_name(), None);
}

#[test]
fn test_while_blank_after_failure_runs_once() {
    let plan = PlanNode::simple("controller").with_children([
        PlanNode::while_controller("while", "").with_children(samplers(&["one", "two"])),
        PlanNode::sampler("three"),
    ]);
    let mut harness = Harness::new(&plan);
    set_last_sample(&mut harness, false);
    assert_eq!(
        harness.passes(2),
        vec![names(&["one", "two", "three"]), names(&["one", "two", "three"])]
    );
}

#[test]
fn test_while_last_after_failure_does_not_start() {
    let plan = PlanNode::simple("controller").with_children([
        PlanNode::while_controller("while", "LAST").with_children(samplers(&["one", "two"])),
        PlanNode::sampler("three"),
    ]);
    let mut harness = Harness::new(&plan);
    set_last_sample(&mut harness, false);
    assert_eq!(harness.pass(), names(&["three"]));
}
