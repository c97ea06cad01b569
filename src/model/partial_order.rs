//! Operations on the causal partial order.
//!
//! The {machine, created} edges form the causal skeleton of a program graph.
//! Everything here walks that skeleton iteratively, so arbitrarily long
//! executions never exhaust the stack.
//!
//! - [`clone_partial_order`] copies the reachable graph into a fresh arena
//! - [`count_tree_size`] and [`steps_in_subtree`] measure a subtree
//! - [`slice_subtree`] removes a subtree and splices the cross-links around it
//! - [`steps_match`] decides whether steps of two graphs correspond

use super::graph::ProgramGraph;
use super::step::{ProgramStepType, StepEdges};
use crate::schedule::schedulable::OperationKind;
use crate::state::fingerprint::Signature;
use crate::types::{MonitorId, StepId};
use std::collections::{BTreeMap, BTreeSet};

/// A deep copy of a partial order together with the old-to-new id mapping.
#[derive(Debug, Clone)]
pub struct ClonedPartialOrder {
    /// The copied graph. Ids are dense in visit order.
    pub graph: ProgramGraph,
    /// Root of the copy.
    pub root: StepId,
    mapping: BTreeMap<StepId, StepId>,
}

impl ClonedPartialOrder {
    /// The copy of `original`, if it was reachable from the cloned root.
    #[must_use]
    pub fn map(&self, original: StepId) -> Option<StepId> {
        self.mapping.get(&original).copied()
    }

    /// Number of copied steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns true if nothing was copied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Deep-copies every step reachable from `root` via {machine, created}.
///
/// Enqueued and monitor edges are rewired through the id mapping afterwards;
/// a cross-link to a step outside the copy is dropped.
#[must_use]
pub fn clone_partial_order(graph: &ProgramGraph, root: StepId) -> ClonedPartialOrder {
    let mut cloned = ProgramGraph::new();
    let mut mapping = BTreeMap::new();
    let mut visit_order = Vec::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if mapping.contains_key(&id) {
            continue;
        }
        mapping.insert(id, cloned.add(graph[id].detached()));
        visit_order.push(id);
        let edges = &graph[id].edges;
        // created goes on the stack first so the machine successor is copied first
        stack.extend(edges.created);
        stack.extend(edges.next_machine);
    }

    for &old in &visit_order {
        let new = mapping[&old];
        let edges = &graph[old].edges;
        if let Some(&next) = edges.next_machine.and_then(|n| mapping.get(&n)) {
            cloned.link_machine(new, next);
        }
        if let Some(&created) = edges.created.and_then(|c| mapping.get(&c)) {
            cloned.link_created(new, created);
        }
        if let Some(&next) = edges.next_enqueued.and_then(|n| mapping.get(&n)) {
            cloned.link_enqueued(new, next);
        }
        for (&monitor, next) in &edges.next_monitor {
            if let Some(&next) = mapping.get(next) {
                cloned.link_monitor(monitor, new, next);
            }
        }
    }

    ClonedPartialOrder {
        graph: cloned,
        root: mapping[&root],
        mapping,
    }
}

/// Every step reachable from `root` via {machine, created}, `root` included.
#[must_use]
pub fn steps_in_subtree(graph: &ProgramGraph, root: StepId) -> BTreeSet<StepId> {
    let mut visited = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if visited.insert(id) {
            stack.extend(graph[id].edges.causal_children());
        }
    }
    visited
}

/// Number of distinct steps reachable from `root` via {machine, created}.
///
/// A step reachable both ways is counted once.
#[must_use]
pub fn count_tree_size(graph: &ProgramGraph, root: StepId) -> usize {
    steps_in_subtree(graph, root).len()
}

/// Detaches the subtree rooted at `step` from the rest of the graph.
///
/// Enqueued and monitor chains passing through the subtree are spliced so
/// the surviving steps keep their relative order. The removed steps stay in
/// the arena with all edges cleared. Returns the removed ids.
pub fn slice_subtree(graph: &mut ProgramGraph, step: StepId) -> BTreeSet<StepId> {
    let removed = steps_in_subtree(graph, step);
    let outside = |id: &StepId| !removed.contains(id);

    for &id in &removed {
        let edges = graph[id].edges.clone();
        if let Some(prev) = edges.prev_machine.filter(outside) {
            graph[prev].edges.next_machine = None;
        }
        if let Some(creator) = edges.creator.filter(outside) {
            graph[creator].edges.created = None;
        }

        // splice at the first removed step of each run
        if !edges.prev_enqueued.is_some_and(|p| removed.contains(&p)) {
            let mut next = edges.next_enqueued;
            while let Some(n) = next.filter(|n| removed.contains(n)) {
                next = graph[n].edges.next_enqueued;
            }
            if let Some(prev) = edges.prev_enqueued {
                graph[prev].edges.next_enqueued = next;
            }
            if let Some(next) = next {
                graph[next].edges.prev_enqueued = edges.prev_enqueued;
            }
        }
        for (&monitor, &first_next) in &edges.next_monitor {
            let prev = edges.prev_monitor.get(&monitor).copied();
            if prev.is_some_and(|p| removed.contains(&p)) {
                continue;
            }
            let next = skip_removed_monitor(graph, &removed, monitor, first_next);
            splice_monitor(graph, monitor, prev, next);
        }
        for (&monitor, &prev) in &edges.prev_monitor {
            if outside(&prev) && !edges.next_monitor.contains_key(&monitor) {
                graph[prev].edges.next_monitor.remove(&monitor);
            }
        }
    }

    for &id in &removed {
        graph[id].edges = StepEdges::default();
    }
    removed
}

fn skip_removed_monitor(
    graph: &ProgramGraph,
    removed: &BTreeSet<StepId>,
    monitor: MonitorId,
    first: StepId,
) -> Option<StepId> {
    let mut next = Some(first);
    while let Some(n) = next.filter(|n| removed.contains(n)) {
        next = graph[n].edges.next_monitor.get(&monitor).copied();
    }
    next
}

fn splice_monitor(
    graph: &mut ProgramGraph,
    monitor: MonitorId,
    prev: Option<StepId>,
    next: Option<StepId>,
) {
    if let Some(prev) = prev {
        match next {
            Some(next) => graph[prev].edges.next_monitor.insert(monitor, next),
            None => graph[prev].edges.next_monitor.remove(&monitor),
        };
    }
    if let Some(next) = next {
        match prev {
            Some(prev) => graph[next].edges.prev_monitor.insert(monitor, prev),
            None => graph[next].edges.prev_monitor.remove(&monitor),
        };
    }
}

/// Structural shape of one step on a causal path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StepShape {
    step_type: ProgramStepType,
    op: Option<OperationKind>,
    signature: Signature,
    boolean_choice: Option<bool>,
    integer_choice: Option<u32>,
    inbox_depth: usize,
}

fn causal_path(graph: &ProgramGraph, step: StepId) -> Vec<StepShape> {
    let mut path = Vec::new();
    let mut at = Some(step);
    while let Some(id) = at {
        let s = &graph[id];
        path.push(StepShape {
            step_type: s.step_type,
            op: s.op,
            signature: s.signature,
            boolean_choice: s.boolean_choice,
            integer_choice: s.integer_choice,
            inbox_depth: graph.inbox_depth(id),
        });
        at = s.edges.causal_parent();
    }
    path
}

/// Decides whether `first` in `graph1` and `second` in `graph2` are the
/// same step of two causally equivalent executions.
///
/// Two steps match when their causal paths back to the root have the same
/// length and agree, node by node, on step type, operation, payload
/// signature, choice value, and position in the inbox order. Actor and
/// message ids are not compared; they are assigned per run.
#[must_use]
pub fn steps_match(
    graph1: &ProgramGraph,
    first: StepId,
    graph2: &ProgramGraph,
    second: StepId,
) -> bool {
    causal_path(graph1, first) == causal_path(graph2, second)
}
