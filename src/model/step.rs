//! Nodes of the causal program graph.
//!
//! A [`ProgramStep`] records one decision of an execution: a scheduled
//! operation or a nondeterministic choice. Steps never own each other; every
//! relationship is an optional [`StepId`] into the owning
//! [`ProgramGraph`](super::graph::ProgramGraph) arena.

use crate::schedule::schedulable::{OperationKind, Schedulable};
use crate::state::fingerprint::Signature;
use crate::types::{ActorId, MessageId, MonitorId, StepId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a program step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramStepType {
    /// The harness entry point. Every graph has exactly one.
    Root,
    /// A scheduled operation.
    Schedulable,
    /// A nondeterministic boolean choice.
    NonDetBool,
    /// A nondeterministic integer choice.
    NonDetInt,
}

/// Causal edges of a step.
///
/// Each forward edge has a matching back edge on the other endpoint; the
/// graph's `link_*` methods keep both sides in sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEdges {
    /// Next step executed by the same actor.
    pub next_machine: Option<StepId>,
    /// Previous step executed by the same actor.
    pub prev_machine: Option<StepId>,
    /// The `Start` or `Receive` this `Create` or `Send` caused.
    pub created: Option<StepId>,
    /// The `Create` or `Send` that caused this `Start` or `Receive`.
    pub creator: Option<StepId>,
    /// Next step in the same inbox order.
    pub next_enqueued: Option<StepId>,
    /// Previous step in the same inbox order.
    pub prev_enqueued: Option<StepId>,
    /// Next step that talked to each monitor.
    pub next_monitor: BTreeMap<MonitorId, StepId>,
    /// Previous step that talked to each monitor.
    pub prev_monitor: BTreeMap<MonitorId, StepId>,
}

impl StepEdges {
    /// Parent of the step in the {machine, created} skeleton.
    ///
    /// The creator wins when a handler is also linked to its actor's
    /// previous step.
    #[must_use]
    pub const fn causal_parent(&self) -> Option<StepId> {
        match self.creator {
            Some(creator) => Some(creator),
            None => self.prev_machine,
        }
    }

    /// Children of the step in the {machine, created} skeleton, machine
    /// successor first. A child reachable both ways is listed once.
    pub fn causal_children(&self) -> impl Iterator<Item = StepId> {
        let created = self.created.filter(|c| Some(*c) != self.next_machine);
        self.next_machine.into_iter().chain(created)
    }
}

/// One node of the program graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramStep {
    /// What the step records.
    pub step_type: ProgramStepType,
    /// Operation kind, for root and schedulable steps.
    pub op: Option<OperationKind>,
    /// Actor that executed the step.
    pub actor: ActorId,
    /// Receiver of a `Send`, or the actor brought up by a `Create`.
    pub target: Option<ActorId>,
    /// Message sent or received.
    pub message: Option<MessageId>,
    /// Payload signature used when matching against a live operation.
    pub signature: Signature,
    /// Value of a boolean choice.
    pub boolean_choice: Option<bool>,
    /// Value of an integer choice.
    pub integer_choice: Option<u32>,
    /// Position in the recorded total order.
    pub total_order: usize,
    /// Index of the matching schedule-trace step, when there is one.
    pub schedule_index: Option<usize>,
    /// Causal edges.
    pub edges: StepEdges,
}

impl ProgramStep {
    fn blank(step_type: ProgramStepType, actor: ActorId) -> Self {
        Self {
            step_type,
            op: None,
            actor,
            target: None,
            message: None,
            signature: Signature::default(),
            boolean_choice: None,
            integer_choice: None,
            total_order: 0,
            schedule_index: None,
            edges: StepEdges::default(),
        }
    }

    /// The root step for the harness actor.
    #[must_use]
    pub fn root(harness: ActorId) -> Self {
        let mut step = Self::blank(ProgramStepType::Root, harness);
        step.op = Some(OperationKind::Start);
        step
    }

    /// A step recording the scheduled operation `op`.
    #[must_use]
    pub fn scheduled(op: &Schedulable) -> Self {
        let mut step = Self::blank(ProgramStepType::Schedulable, op.id);
        step.op = Some(op.kind);
        step.target = op.target;
        step.message = op.message;
        step.signature = op.signature;
        step
    }

    /// A step recording a boolean choice made by `actor`.
    #[must_use]
    pub fn boolean(actor: ActorId, value: bool) -> Self {
        let mut step = Self::blank(ProgramStepType::NonDetBool, actor);
        step.boolean_choice = Some(value);
        step
    }

    /// A step recording an integer choice made by `actor`.
    #[must_use]
    pub fn integer(actor: ActorId, value: u32) -> Self {
        let mut step = Self::blank(ProgramStepType::NonDetInt, actor);
        step.integer_choice = Some(value);
        step
    }

    /// Associates the step with a schedule-trace index.
    #[must_use]
    pub const fn at_schedule_index(mut self, index: usize) -> Self {
        self.schedule_index = Some(index);
        self
    }

    /// Returns true if this is a scheduled operation of kind `kind`.
    #[must_use]
    pub fn is_op(&self, kind: OperationKind) -> bool {
        self.step_type == ProgramStepType::Schedulable && self.op == Some(kind)
    }

    /// Returns true for `Start` and `Receive` steps, which run a handler.
    #[must_use]
    pub fn is_handler(&self) -> bool {
        self.is_op(OperationKind::Start)
            || self.is_op(OperationKind::Receive)
            || self.step_type == ProgramStepType::Root
    }

    /// Copy of the step with all edges removed.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            edges: StepEdges::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_step_copies_operation() {
        let op = Schedulable::new(ActorId::new(2), OperationKind::Send)
            .with_target(ActorId::new(3))
            .with_message(MessageId::new(9))
            .with_signature(Signature::from_raw(5));
        let step = ProgramStep::scheduled(&op);
        assert_eq!(step.step_type, ProgramStepType::Schedulable);
        assert!(step.is_op(OperationKind::Send));
        assert_eq!(step.target, Some(ActorId::new(3)));
        assert_eq!(step.message, Some(MessageId::new(9)));
        assert_eq!(step.signature, Signature::from_raw(5));
        assert!(!step.is_handler());
    }

    #[test]
    fn choice_steps_have_no_operation() {
        let flip = ProgramStep::boolean(ActorId::new(1), true);
        let pick = ProgramStep::integer(ActorId::new(1), 4);
        assert_eq!(flip.op, None);
        assert_eq!(flip.boolean_choice, Some(true));
        assert_eq!(pick.step_type, ProgramStepType::NonDetInt);
        assert_eq!(pick.integer_choice, Some(4));
    }

    #[test]
    fn creator_is_preferred_parent() {
        let edges = StepEdges {
            prev_machine: Some(StepId::from_index(1)),
            creator: Some(StepId::from_index(2)),
            ..StepEdges::default()
        };
        assert_eq!(edges.causal_parent(), Some(StepId::from_index(2)));
    }

    #[test]
    fn shared_child_listed_once() {
        let child = StepId::from_index(4);
        let edges = StepEdges {
            next_machine: Some(child),
            created: Some(child),
            ..StepEdges::default()
        };
        assert_eq!(edges.causal_children().collect::<Vec<_>>(), vec![child]);
    }

    #[test]
    fn detached_drops_edges() {
        let mut step = ProgramStep::root(ActorId::HARNESS);
        step.edges.next_machine = Some(StepId::from_index(1));
        assert_eq!(step.detached().edges, StepEdges::default());
        assert!(step.is_handler());
    }
}
