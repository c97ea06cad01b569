//! Causal readiness tracking over a recorded program graph.
//!
//! The [`ReplayFrontier`] walks a recorded graph alongside a live
//! execution. It knows which recorded steps have been replayed, which are
//! enabled (their causal parent was replayed), and which of those are ready
//! (every inbox and monitor predecessor was replayed too). It also binds
//! recorded actor and message ids to their live counterparts, since a new
//! run assigns its own.

use crate::model::graph::ProgramGraph;
use crate::model::partial_order::steps_in_subtree;
use crate::model::step::{ProgramStep, ProgramStepType};
use crate::schedule::schedulable::{enabled_ops, OperationKind, Schedulable};
use crate::types::{ActorId, MessageId, StepId};
use std::collections::{BTreeMap, BTreeSet};

/// Decides whether a recorded step and a live operation carry the same payload.
pub trait StepMatcher {
    /// Returns true if `live` can stand in for `recorded`.
    fn matches(&self, recorded: &ProgramStep, live: &Schedulable) -> bool;
}

/// Matches on exact payload signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSignature;

impl StepMatcher for ExactSignature {
    fn matches(&self, recorded: &ProgramStep, live: &Schedulable) -> bool {
        recorded.signature == live.signature
    }
}

/// A causally ready recorded step paired with the live actor that can run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCandidate {
    /// The recorded step.
    pub step: StepId,
    /// Live actor whose pending operation matches the step.
    pub actor: ActorId,
    /// Position of the step in the recorded total order.
    pub total_order: usize,
}

/// Replay progress over a recorded graph.
#[derive(Debug, Clone)]
pub struct ReplayFrontier {
    seen: BTreeSet<StepId>,
    enabled: BTreeSet<StepId>,
    dropped: BTreeSet<StepId>,
    live_messages: BTreeMap<StepId, MessageId>,
    actor_remap: BTreeMap<ActorId, ActorId>,
    current: StepId,
    monitor_ordering: bool,
}

impl ReplayFrontier {
    /// Starts at `root`, which counts as replayed.
    ///
    /// The root's actor is bound to the live harness. With
    /// `monitor_ordering`, steps also wait for their monitor predecessors.
    #[must_use]
    pub fn new(graph: &ProgramGraph, root: StepId, monitor_ordering: bool) -> Self {
        let mut frontier = Self {
            seen: BTreeSet::from([root]),
            enabled: BTreeSet::new(),
            dropped: BTreeSet::new(),
            live_messages: BTreeMap::new(),
            actor_remap: BTreeMap::from([(graph[root].actor, ActorId::HARNESS)]),
            current: root,
            monitor_ordering,
        };
        frontier.enable_children(graph, root);
        frontier
    }

    fn enable_children(&mut self, graph: &ProgramGraph, step: StepId) {
        for child in graph[step].edges.causal_children() {
            if !self.dropped.contains(&child) {
                self.enabled.insert(child);
            }
        }
    }

    fn is_done(&self, step: StepId) -> bool {
        self.seen.contains(&step) || self.dropped.contains(&step)
    }

    fn is_ready(&self, graph: &ProgramGraph, step: StepId) -> bool {
        let edges = &graph[step].edges;
        edges.prev_enqueued.map_or(true, |p| self.is_done(p))
            && (!self.monitor_ordering || edges.prev_monitor.values().all(|&p| self.is_done(p)))
    }

    /// The most recently replayed step.
    #[must_use]
    pub const fn current(&self) -> StepId {
        self.current
    }

    /// Returns true if `step` has been replayed.
    #[must_use]
    pub fn is_seen(&self, step: StepId) -> bool {
        self.seen.contains(&step)
    }

    /// Live id bound to a recorded actor, if the actor exists yet.
    #[must_use]
    pub fn live_actor(&self, recorded: ActorId) -> Option<ActorId> {
        self.actor_remap.get(&recorded).copied()
    }

    /// Enabled scheduled steps whose inbox and monitor predecessors are done.
    #[must_use]
    pub fn ready_steps(&self, graph: &ProgramGraph) -> Vec<StepId> {
        self.enabled
            .iter()
            .copied()
            .filter(|&s| graph[s].step_type == ProgramStepType::Schedulable)
            .filter(|&s| self.is_ready(graph, s))
            .collect()
    }

    /// Ready steps that an enabled live operation can reproduce, in
    /// recorded total order.
    ///
    /// A live operation reproduces a step when it belongs to the bound
    /// actor, has the same kind, targets the bound actor, satisfies
    /// `matcher`, and, for a receive, dequeues the message of the recorded
    /// creator send.
    #[must_use]
    pub fn candidates(
        &self,
        graph: &ProgramGraph,
        ops: &[Schedulable],
        matcher: &dyn StepMatcher,
    ) -> Vec<ReplayCandidate> {
        let mut candidates: Vec<_> = self
            .ready_steps(graph)
            .into_iter()
            .filter_map(|id| {
                let step = &graph[id];
                let actor = self.live_actor(step.actor)?;
                let op = enabled_ops(ops).find(|op| op.id == actor)?;
                self.reproduces(step, op, matcher).then_some(ReplayCandidate {
                    step: id,
                    actor,
                    total_order: step.total_order,
                })
            })
            .collect();
        candidates.sort_by_key(|c| c.total_order);
        candidates
    }

    fn reproduces(
        &self,
        step: &ProgramStep,
        op: &Schedulable,
        matcher: &dyn StepMatcher,
    ) -> bool {
        if step.op != Some(op.kind) || !matcher.matches(step, op) {
            return false;
        }
        if op.kind == OperationKind::Send {
            let bound = step.target.and_then(|t| self.live_actor(t));
            if bound.is_some() && bound != op.target {
                return false;
            }
        }
        if op.kind == OperationKind::Receive {
            let expected = step
                .edges
                .creator
                .and_then(|send| self.live_messages.get(&send));
            return expected.is_some() && expected == op.message.as_ref();
        }
        true
    }

    /// Marks `step` as replayed by `live` and enables its causal children.
    ///
    /// `live` is the operation that ran, or `None` for a choice step.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not enabled.
    pub fn record_choice(
        &mut self,
        graph: &ProgramGraph,
        step: StepId,
        live: Option<&Schedulable>,
    ) {
        assert!(self.enabled.remove(&step), "replayed step {step} was not enabled");
        self.seen.insert(step);
        self.enable_children(graph, step);

        let recorded = &graph[step];
        match (recorded.op, live) {
            (Some(OperationKind::Send), Some(live)) => {
                if let Some(message) = live.message {
                    self.live_messages.insert(step, message);
                }
            }
            (Some(OperationKind::Receive), _) => {
                if let Some(send) = recorded.edges.creator {
                    self.live_messages.remove(&send);
                }
            }
            (Some(OperationKind::Create), Some(live)) => {
                if let (Some(from), Some(to)) = (recorded.target, live.target) {
                    self.actor_remap.insert(from, to);
                }
            }
            _ => {}
        }
        self.current = step;
    }

    /// The enabled choice step of type `step_type` belonging to the actor of
    /// the current step.
    #[must_use]
    pub fn next_choice_step(
        &self,
        graph: &ProgramGraph,
        step_type: ProgramStepType,
    ) -> Option<StepId> {
        let actor = graph[self.current].actor;
        self.enabled
            .iter()
            .copied()
            .find(|&s| graph[s].step_type == step_type && graph[s].actor == actor)
    }

    /// Records that the live run dropped `send` instead of delivering it.
    ///
    /// The receive it caused, and everything downstream of that receive,
    /// can no longer happen.
    pub fn record_send_dropped(&mut self, graph: &ProgramGraph, send: StepId) {
        if let Some(created) = graph[send].edges.created {
            self.enabled.remove(&created);
            self.dropped.extend(steps_in_subtree(graph, created));
        }
        self.live_messages.remove(&send);
    }

    /// Returns true once every recorded step is replayed or dropped.
    #[must_use]
    pub fn has_reached_end(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Returns true if the actor of `step` has no recorded scheduled step
    /// after it: no later handler and no later operation in its thread.
    #[must_use]
    pub fn is_last_schedulable_step_of_actor(graph: &ProgramGraph, step: StepId) -> bool {
        let mut at = step;
        if graph[at].edges.next_enqueued.is_some() && graph[at].is_handler() {
            return false;
        }
        while let Some(next) = graph[at].edges.next_machine {
            if graph[next].step_type == ProgramStepType::Schedulable {
                return false;
            }
            at = next;
        }
        true
    }
}
