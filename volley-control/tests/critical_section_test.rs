mod common;

use common::{names, Harness};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use volley_control::{PlanNode, SharedState, TraversalOptions};
use volley_core::ThreadContext;

fn guarded(lock: &str, loops: i64) -> PlanNode {
    PlanNode::loop_controller("loop", loops, false).with_child(
        PlanNode::critical_section("section", lock)
            .with_children([PlanNode::sampler("enter"), PlanNode::sampler("leave")]),
    )
}

fn harness_on(plan: &PlanNode, shared: &Arc<SharedState>, thread_num: usize) -> Harness {
    let ctx = ThreadContext::new(thread_num, format!("user-{}", thread_num));
    Harness::build(plan, TraversalOptions::default(), shared.clone(), ctx)
}

#[test]
fn test_sections_with_same_lock_never_overlap() {
    let plan = guarded("db", 30);
    let shared = Arc::new(SharedState::new());
    let inside = AtomicUsize::new(0);
    let max_inside = AtomicUsize::new(0);

    thread::scope(|scope| {
        for thread_num in 0..3 {
            let mut harness = harness_on(&plan, &shared, thread_num);
            let (inside, max_inside) = (&inside, &max_inside);
            scope.spawn(move || {
                while let Some(name) = harness.next_name() {
                    match name.as_str() {
                        "enter" => {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_micros(200));
                        }
                        "leave" => {
                            inside.fetch_sub(1, Ordering::SeqCst);
                        }
                        other => panic!("unexpected item {}", other),
                    }
                }
            });
        }
    });

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(inside.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lock_is_held_for_the_whole_pass() {
    let plan = guarded("orders", 1);
    let shared = Arc::new(SharedState::new());
    let mut harness = harness_on(&plan, &shared, 0);

    assert_eq!(harness.next_name().as_deref(), Some("enter"));
    let lock = shared.locks.get_or_create("orders");
    assert!(lock.is_held_by_current_thread());
    assert_eq!(harness.next_name().as_deref(), Some("leave"));
    assert!(lock.is_locked());
    assert_eq!(harness.next_name(), None);
    assert!(!lock.is_locked());
}

#[test]
fn test_lock_released_when_children_finish_for_good() {
    let plan = PlanNode::loop_controller("main", 3, false).with_children([
        PlanNode::critical_section("section", "db").with_child(
            PlanNode::loop_controller("once", 1, false).with_child(PlanNode::sampler("inside")),
        ),
        PlanNode::sampler("outside"),
    ]);
    let shared = Arc::new(SharedState::new());
    let mut harness = harness_on(&plan, &shared, 0);
    let lock = shared.locks.get_or_create("db");

    assert_eq!(harness.next_name().as_deref(), Some("inside"));
    assert!(lock.is_held_by_current_thread());
    assert_eq!(harness.next_name().as_deref(), Some("outside"));
    assert!(!lock.is_locked());

    let mut other = harness_on(&plan, &shared, 1);
    assert_eq!(other.next_name().as_deref(), Some("inside"));
    assert_eq!(other.next_name().as_deref(), Some("outside"));

    assert_eq!(harness.drain(3), names(&["outside", "outside"]));
    assert!(harness.traversal.is_done());
    assert!(!lock.is_locked());
}

#[test]
fn test_dead_thread_releases_its_lock() {
    let plan = guarded("files", 1);
    let shared = Arc::new(SharedState::new());

    let crashed = {
        let mut harness = harness_on(&plan, &shared, 0);
        thread::spawn(move || {
            assert_eq!(harness.next_name().as_deref(), Some("enter"));
            panic!("virtual user died inside the critical section");
        })
        .join()
    };
    assert!(crashed.is_err());
    assert!(!shared.locks.get_or_create("files").is_locked());

    let mut survivor = harness_on(&plan, &shared, 1);
    assert_eq!(survivor.drain(2), names(&["enter", "leave"]));
}

#[test]
fn test_thread_finished_releases_mid_pass() {
    let plan = guarded("cache", 2);
    let shared = Arc::new(SharedState::new());
    let mut harness = harness_on(&plan, &shared, 0);

    assert_eq!(harness.next_name().as_deref(), Some("enter"));
    harness.traversal.thread_finished();
    assert!(!shared.locks.get_or_create("cache").is_locked());
    // A second call has nothing left to release
    harness.traversal.thread_finished();
}

#[test]
fn test_nested_sections_with_same_name_reenter() {
    let plan = PlanNode::simple("root").with_child(
        PlanNode::critical_section("outer", "same").with_children([
            PlanNode::sampler("a"),
            PlanNode::critical_section("inner", "same").with_child(PlanNode::sampler("b")),
            PlanNode::sampler("c"),
        ]),
    );
    let shared = Arc::new(SharedState::new());
    let mut harness = harness_on(&plan, &shared, 0);
    assert_eq!(harness.passes(2), vec![names(&["a", "b", "c"]), names(&["a", "b", "c"])]);
    assert!(!shared.locks.get_or_create("same").is_locked());
}

#[test]
fn test_blank_lock_name_runs_unlocked() {
    let plan = guarded("  ", 2);
    let shared = Arc::new(SharedState::new());
    let mut harness = harness_on(&plan, &shared, 0);
    assert_eq!(harness.drain(2), names(&["enter", "leave", "enter", "leave"]));
    assert!(shared.locks.is_empty());
}

#[test]
fn test_test_end_clears_registry() {
    let plan = guarded("db", 1);
    let shared = Arc::new(SharedState::new());
    harness_on(&plan, &shared, 0).drain(2);
    assert_eq!(shared.locks.len(), 1);
    shared.test_ended();
    assert!(shared.locks.is_empty());
}
