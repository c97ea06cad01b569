//! Records the causal program graph of one execution.
//!
//! The [`ProgramModel`] is fed every scheduled operation and every
//! nondeterministic choice, in execution order, and wires the causal edges
//! between them as it goes:
//!
//! | Step | Edges added |
//! |------|-------------|
//! | `Create` | remembered, later linked as creator of the new actor's `Start` |
//! | `Start` | created edge from the `Create` |
//! | `Send` | enqueued edge from the previous send to the same target |
//! | `Receive` | created edge from the matching send; enqueued edge from the actor's previous handler |
//! | any | machine edge from the actor's previous step |
//!
//! `Start` steps never get a machine edge. `Receive` steps get one only when
//! successive handlers are connected.

use super::graph::ProgramGraph;
use super::partial_order::clone_partial_order;
use super::step::{ProgramStep, ProgramStepType};
use super::summary::ProgramModelSummary;
use crate::liveness::monitor::MonitorStatus;
use crate::schedule::schedulable::OperationKind;
use crate::tracing_compat::trace;
use crate::types::{ActorId, MessageId, MonitorId, StepId};
use std::collections::{BTreeMap, BTreeSet};

/// Builds the program graph of a single execution.
#[derive(Debug, Clone)]
pub struct ProgramModel {
    graph: ProgramGraph,
    root: StepId,
    active: StepId,
    ordered: Vec<StepId>,
    connect_successive_handlers: bool,
    recording: bool,

    pending_sends: BTreeMap<MessageId, StepId>,
    create_steps: BTreeMap<ActorId, StepId>,
    last_step: BTreeMap<ActorId, StepId>,
    latest_send_to: BTreeMap<ActorId, StepId>,
    latest_handler: BTreeMap<ActorId, StepId>,
    latest_monitor_step: BTreeMap<MonitorId, StepId>,
    hot_entry: BTreeMap<MonitorId, StepId>,
    dropped_sends: BTreeSet<StepId>,

    bug_step: Option<StepId>,
    liveness_monitor: Option<String>,
}

impl ProgramModel {
    /// Creates a model whose root step belongs to `harness`.
    #[must_use]
    pub fn new(harness: ActorId, connect_successive_handlers: bool) -> Self {
        let mut graph = ProgramGraph::new();
        let root = graph.add(ProgramStep::root(harness));
        Self {
            graph,
            root,
            active: root,
            ordered: vec![root],
            connect_successive_handlers,
            recording: true,
            pending_sends: BTreeMap::new(),
            create_steps: BTreeMap::new(),
            last_step: BTreeMap::from([(harness, root)]),
            latest_send_to: BTreeMap::new(),
            latest_handler: BTreeMap::from([(harness, root)]),
            latest_monitor_step: BTreeMap::new(),
            hot_entry: BTreeMap::new(),
            dropped_sends: BTreeSet::new(),
            bug_step: None,
            liveness_monitor: None,
        }
    }

    /// Appends `step` and wires its causal edges.
    ///
    /// Returns `None` once recording has stopped.
    ///
    /// # Panics
    ///
    /// Panics if a `Receive` has no recorded send for its message, or a
    /// `Start` has no recorded `Create`. Both mean the caller fed steps out
    /// of execution order.
    pub fn record_step(&mut self, mut step: ProgramStep) -> Option<StepId> {
        if !self.recording {
            return None;
        }
        step.total_order = self.ordered.len();
        let actor = step.actor;
        let op = step.op.filter(|_| step.step_type == ProgramStepType::Schedulable);
        let target = step.target;
        let message = step.message;
        let id = self.graph.add(step);

        match op {
            Some(OperationKind::Create) => {
                if let Some(target) = target {
                    self.create_steps.insert(target, id);
                }
            }
            Some(OperationKind::Send) => {
                if let Some(message) = message {
                    self.pending_sends.insert(message, id);
                }
                if let Some(target) = target {
                    if let Some(prev) = self.latest_send_to.insert(target, id) {
                        self.graph.link_enqueued(prev, id);
                    }
                }
            }
            Some(OperationKind::Receive) => {
                let send = message
                    .and_then(|m| self.pending_sends.remove(&m))
                    .unwrap_or_else(|| panic!("receive by {actor} has no recorded send"));
                self.graph.link_created(send, id);
                if let Some(prev) = self.latest_handler.insert(actor, id) {
                    self.graph.link_enqueued(prev, id);
                }
            }
            Some(OperationKind::Start) => {
                let create = self
                    .create_steps
                    .get(&actor)
                    .copied()
                    .unwrap_or_else(|| panic!("start of {actor} has no recorded create"));
                self.graph.link_created(create, id);
                self.latest_handler.insert(actor, id);
            }
            _ => {}
        }

        let links_machine = match op {
            Some(OperationKind::Start) => false,
            Some(OperationKind::Receive) => self.connect_successive_handlers,
            _ => true,
        };
        if links_machine {
            if let Some(&prev) = self.last_step.get(&actor) {
                self.graph.link_machine(prev, id);
            }
        }

        self.last_step.insert(actor, id);
        self.ordered.push(id);
        self.active = id;
        trace!(step = %id, actor = %actor, "recorded program step");
        Some(id)
    }

    /// Records that the active step delivered an event to `monitor`.
    pub fn record_monitor_event(&mut self, monitor: MonitorId) {
        if !self.recording {
            return;
        }
        let active = self.active;
        if let Some(prev) = self.latest_monitor_step.insert(monitor, active) {
            if prev != active {
                self.graph.link_monitor(monitor, prev, active);
            }
        }
    }

    /// Records a status transition of `monitor` caused by the active step.
    pub fn record_monitor_status(&mut self, monitor: MonitorId, status: MonitorStatus) {
        if !self.recording {
            return;
        }
        if status.is_hot() {
            self.hot_entry.insert(monitor, self.active);
        } else {
            self.hot_entry.remove(&monitor);
        }
    }

    /// Records that the send step `send` was dropped instead of delivered.
    pub fn record_send_dropped(&mut self, send: StepId) {
        if let Some(message) = self.graph[send].message {
            self.pending_sends.remove(&message);
        }
        self.dropped_sends.insert(send);
    }

    /// Marks the most recent step as the one that triggered a safety bug.
    pub fn record_safety_bug(&mut self) {
        self.bug_step = self.ordered.last().copied();
        self.liveness_monitor = None;
    }

    /// Marks the step that last made `monitor` hot as the liveness bug step.
    pub fn record_liveness_bug(&mut self, monitor: MonitorId, name: &str) {
        self.bug_step = self
            .hot_entry
            .get(&monitor)
            .copied()
            .or_else(|| self.ordered.last().copied());
        self.liveness_monitor = Some(name.to_owned());
    }

    /// Stops recording. Later steps are ignored.
    pub fn stop_recording(&mut self) {
        self.recording = false;
    }

    /// Returns true while steps are being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// The recorded graph.
    #[must_use]
    pub const fn graph(&self) -> &ProgramGraph {
        &self.graph
    }

    /// The root step.
    #[must_use]
    pub const fn root(&self) -> StepId {
        self.root
    }

    /// The most recently recorded step.
    #[must_use]
    pub const fn active(&self) -> StepId {
        self.active
    }

    /// Every recorded step in execution order, root first.
    #[must_use]
    pub fn ordered(&self) -> &[StepId] {
        &self.ordered
    }

    /// The step that triggered the bug, once one was recorded.
    #[must_use]
    pub const fn bug_step(&self) -> Option<StepId> {
        self.bug_step
    }

    /// Send steps that were dropped.
    #[must_use]
    pub const fn dropped_sends(&self) -> &BTreeSet<StepId> {
        &self.dropped_sends
    }

    /// The step that made `monitor` hot, while it stays hot.
    #[must_use]
    pub fn hot_entry(&self, monitor: MonitorId) -> Option<StepId> {
        self.hot_entry.get(&monitor).copied()
    }

    /// Clones the recorded partial order into a standalone summary.
    #[must_use]
    pub fn summary(&self) -> ProgramModelSummary {
        let cloned = clone_partial_order(&self.graph, self.root);
        let bug_step = self.bug_step.and_then(|s| cloned.map(s));
        let withheld_sends = self
            .dropped_sends
            .iter()
            .filter_map(|&s| cloned.map(s))
            .collect();
        ProgramModelSummary {
            graph: cloned.graph,
            root: cloned.root,
            bug_step,
            withheld_sends,
            step_count: self.ordered.len(),
            is_liveness_bug: self.liveness_monitor.is_some(),
            liveness_monitor: self.liveness_monitor.clone(),
        }
    }
}
