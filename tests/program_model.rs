//! Program model properties over recorded executions.
//!
//! Every execution of a program yields a causal graph. These tests check
//! the graph utilities against independent walks over real recordings:
//! tree size, partial-order cloning, step matching, slicing, and summary
//! persistence.

#[macro_use]
mod common;

use actorcheck::lab::{execute, ExecutionReport};
use actorcheck::model::{
    clone_partial_order, count_tree_size, slice_subtree, steps_in_subtree, steps_match,
    ProgramGraph, ProgramModelSummary, ProgramStepType, StepEdges,
};
use actorcheck::schedule::{OperationKind, RandomStrategy};
use actorcheck::state::fingerprint::Signature;
use actorcheck::types::StepId;
use common::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn init_test(test_name: &str) {
    init_test_logging();
    test_phase!(test_name);
}

fn record(seed: u64, connect: bool) -> ExecutionReport {
    let program = DigitRace {
        forbidden: None,
        first_digits: vec![1, 2],
    };
    let mut strategy = RandomStrategy::new(seed, 0);
    execute(&program, &mut strategy, connect).expect("execute")
}

fn dfs_reachable(graph: &ProgramGraph, root: StepId) -> BTreeSet<StepId> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let edges = &graph[id].edges;
        stack.extend(edges.next_machine);
        stack.extend(edges.created);
    }
    seen
}

proptest! {
    #![proptest_config(test_proptest_config(64))]

    #[test]
    fn tree_size_counts_each_step_once(seed in any::<u64>(), connect in any::<bool>()) {
        let report = record(seed, connect);
        let model = &report.model;
        let reachable = dfs_reachable(model.graph(), model.root());
        prop_assert_eq!(count_tree_size(model.graph(), model.root()), reachable.len());
        // every recorded step is causally reachable from the root
        prop_assert_eq!(reachable.len(), model.ordered().len());
    }

    #[test]
    fn clone_preserves_structure_and_matching(seed in any::<u64>(), connect in any::<bool>()) {
        let report = record(seed, connect);
        let model = &report.model;
        let cloned = clone_partial_order(model.graph(), model.root());
        prop_assert_eq!(cloned.len(), model.ordered().len());
        prop_assert_eq!(count_tree_size(&cloned.graph, cloned.root), cloned.len());
        for &step in model.ordered() {
            let mapped = cloned.map(step).expect("every step is cloned");
            prop_assert!(steps_match(model.graph(), step, &cloned.graph, mapped));
            prop_assert_eq!(model.graph().inbox_depth(step), cloned.graph.inbox_depth(mapped));
        }
    }

    #[test]
    fn equivalent_schedules_produce_matching_steps(seed in any::<u64>()) {
        // the same seed twice gives two recordings of one execution
        let first = record(seed, false);
        let second = record(seed, false);
        for (&a, &b) in first.model.ordered().iter().zip(second.model.ordered()) {
            prop_assert!(steps_match(first.model.graph(), a, second.model.graph(), b));
        }
    }
}

#[test]
fn differently_ordered_deliveries_do_not_match() {
    init_test("differently_ordered_deliveries_do_not_match");
    let last_receive = |report: &ExecutionReport| {
        report
            .model
            .ordered()
            .iter()
            .rev()
            .copied()
            .find(|&s| report.model.graph()[s].is_op(OperationKind::Receive))
            .expect("a receive")
    };
    let last_value = |report: &ExecutionReport| {
        let step = last_receive(report);
        report.model.graph()[step].signature
    };

    let base = record(0, false);
    let other = (1..64)
        .map(|seed| record(seed, false))
        .find(|r| last_value(r) != last_value(&base))
        .expect("some seed delivers a different last digit");
    assert!(!steps_match(
        base.model.graph(),
        last_receive(&base),
        other.model.graph(),
        last_receive(&other),
    ));
    test_complete!("differently_ordered_deliveries_do_not_match");
}

#[test]
fn slicing_detaches_exactly_the_subtree() {
    init_test("slicing_detaches_exactly_the_subtree");
    let report = record(7, false);
    let mut graph = clone_partial_order(report.model.graph(), report.model.root()).graph;

    let sender_start = graph
        .iter()
        .find(|(_, s)| {
            s.is_op(OperationKind::Start)
                && s.step_type == ProgramStepType::Schedulable
                && s.signature == Signature::of("DigitSender")
        })
        .map(|(id, _)| id)
        .expect("a sender start");
    let expected = steps_in_subtree(&graph, sender_start);
    let removed = slice_subtree(&mut graph, sender_start);
    assert_eq!(removed, expected);
    // the start, both sends, and the receives they caused
    assert_eq!(removed.len(), 5);

    for (id, step) in graph.iter().filter(|(id, _)| !removed.contains(id)) {
        let e = &step.edges;
        let pointers = [
            e.next_machine,
            e.prev_machine,
            e.created,
            e.creator,
            e.next_enqueued,
            e.prev_enqueued,
        ];
        for target in pointers.into_iter().flatten() {
            assert!(!removed.contains(&target), "{id} still points at removed {target}");
        }
        for target in e.next_monitor.values().chain(e.prev_monitor.values()) {
            assert!(!removed.contains(target), "{id} still points at removed {target}");
        }
    }
    for &id in &removed {
        assert_eq!(graph[id].edges, StepEdges::default());
    }
    test_complete!("slicing_detaches_exactly_the_subtree");
}

#[test]
fn summary_survives_json_and_files() {
    init_test("summary_survives_json_and_files");
    let report = record(11, true);
    let summary = report.model.summary();
    assert_eq!(summary.tree_size(), summary.step_count);

    let json = summary.to_json().expect("to json");
    let parsed = ProgramModelSummary::from_json(&json).expect("from json");
    assert_eq!(parsed, summary);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("summary.json");
    summary.save(&path).expect("save");
    let loaded = ProgramModelSummary::load(&path).expect("load");
    assert_eq!(loaded, summary);
    for (id, _) in summary.graph.iter() {
        assert!(steps_match(&summary.graph, id, &loaded.graph, id));
    }
    test_complete!("summary_survives_json_and_files");
}
