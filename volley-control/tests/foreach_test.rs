mod common;

use common::{names, Harness};
use volley_control::plan::ForeachConfig;
use volley_control::{NodeKind, PlanNode};
use volley_core::Variables;

fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs.iter().copied().collect()
}

fn foreach_plan(config: ForeachConfig) -> PlanNode {
    PlanNode::simple("root").with_children([
        PlanNode::new("each", NodeKind::Foreach(config)).with_child(PlanNode::sampler("use")),
        PlanNode::sampler("after"),
    ])
}

fn config(start_index: i64, end_index: Option<i64>, separator: &str) -> ForeachConfig {
    ForeachConfig {
        input_var: "in".to_string(),
        return_var: "out".to_string(),
        separator: separator.to_string(),
        start_index,
        end_index,
    }
}

/// Items of one pass, each paired with the published value
fn pass_with_values(harness: &mut Harness) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    while let Some(name) = harness.next_name() {
        let value = harness.ctx.vars.get("out").map(str::to_string);
        out.push((name, value));
    }
    out
}

fn used(values: &[&str]) -> Vec<(String, Option<String>)> {
    let mut out: Vec<(String, Option<String>)> = values
        .iter()
        .map(|v| ("use".to_string(), Some(v.to_string())))
        .collect();
    out.push(("after".to_string(), values.last().map(|v| v.to_string())));
    out
}

#[test]
fn test_publishes_each_value_in_order() {
    let mut harness = Harness::with_vars(
        &foreach_plan(config(0, None, "_")),
        vars(&[("in_1", "a"), ("in_2", "b"), ("in_3", "c")]),
    );
    assert_eq!(pass_with_values(&mut harness), used(&["a", "b", "c"]));
    assert_eq!(pass_with_values(&mut harness), used(&["a", "b", "c"]));
}

#[test]
fn test_missing_first_value_contributes_nothing() {
    let plan = PlanNode::loop_controller("loop", 3, false).with_children([
        PlanNode::foreach("each", "in", "out").with_child(PlanNode::sampler("use")),
        PlanNode::sampler("after"),
    ]);
    let mut harness = Harness::with_vars(&plan, vars(&[("in_2", "orphan")]));
    assert_eq!(harness.drain(2), names(&["after", "after", "after"]));
    assert!(!harness.ctx.vars.contains("out"));
}

#[test]
fn test_gap_ends_iteration() {
    let mut harness = Harness::with_vars(
        &foreach_plan(config(0, None, "_")),
        vars(&[("in_1", "a"), ("in_2", "b"), ("in_4", "d")]),
    );
    assert_eq!(pass_with_values(&mut harness), used(&["a", "b"]));
}

#[test]
fn test_start_and_end_indexes() {
    let values = vars(&[("in_1", "a"), ("in_2", "b"), ("in_3", "c"), ("in_4", "d")]);

    let mut bounded = Harness::with_vars(&foreach_plan(config(0, Some(2), "_")), values.clone());
    assert_eq!(pass_with_values(&mut bounded), used(&["a", "b"]));

    let mut offset = Harness::with_vars(&foreach_plan(config(1, Some(3), "_")), values);
    assert_eq!(pass_with_values(&mut offset), used(&["b", "c"]));
}

#[test]
fn test_custom_separator() {
    let mut harness = Harness::with_vars(
        &foreach_plan(config(0, None, "-")),
        vars(&[("in-1", "x"), ("in-2", "y"), ("in_3", "ignored")]),
    );
    assert_eq!(pass_with_values(&mut harness), used(&["x", "y"]));
}

#[test]
fn test_values_added_between_passes_are_seen() {
    let mut harness = Harness::with_vars(&foreach_plan(config(0, None, "_")), vars(&[("in_1", "a")]));
    assert_eq!(pass_with_values(&mut harness), used(&["a"]));
    harness.ctx.vars.put("in_2", "b");
    assert_eq!(pass_with_values(&mut harness), used(&["a", "b"]));
}
