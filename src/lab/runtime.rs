//! Deterministic single-threaded actor simulator.
//!
//! The lab runtime executes a [`Program`] under a [`SchedulingStrategy`].
//! Each live actor exposes exactly one pending operation: its start, the
//! head of its outbox (a send or a create), or a receive that is enabled
//! while its inbox is non-empty. At every scheduling point the strategy
//! picks one enabled operation, and the runtime
//!
//! 1. appends the decision to the [`ScheduleTrace`],
//! 2. lets the strategy observe the state in which the decision was made,
//! 3. records a step in the [`ProgramModel`], and
//! 4. runs the operation, including any handler it triggers.
//!
//! Nondeterministic choices made inside handlers follow the same order.
//! Execution is a pure function of the program and the strategy's answers.

use super::actor::{Actor, ActorContext, Event};
use super::explorer::Program;
use crate::error::{Error, Result};
use crate::liveness::monitor::{
    LivenessViolation, Monitor, MonitorSnapshot, MonitorStatus, ViolationKind,
};
use crate::model::recorder::ProgramModel;
use crate::model::step::ProgramStep;
use crate::schedule::schedulable::{enabled_ids, OperationKind, Schedulable};
use crate::schedule::strategy::{ProgramState, SchedulingStrategy};
use crate::state::fingerprint::Signature;
use crate::trace::ScheduleTrace;
use crate::tracing_compat::{debug, debug_span, trace};
use crate::types::{ActorId, MessageId, MonitorId};
use std::collections::VecDeque;
use std::fmt;

/// Why an execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No operation was enabled.
    Quiescent,
    /// A bug was found.
    BugFound,
    /// The strategy reached its step bound.
    StepBound,
    /// The strategy declined to make a decision.
    StrategyExhausted,
}

/// A bug found by an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BugKind {
    /// An actor assertion failed.
    Assertion {
        /// Actor whose assertion failed.
        actor: ActorId,
        /// Assertion message.
        message: String,
    },
    /// A liveness property was violated.
    Liveness(LivenessViolation),
}

impl BugKind {
    /// Returns true for liveness violations.
    #[must_use]
    pub const fn is_liveness(&self) -> bool {
        matches!(self, Self::Liveness(_))
    }
}

impl fmt::Display for BugKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion { actor, message } => {
                write!(f, "assertion failed in {actor}: {message}")
            }
            Self::Liveness(violation) => write!(f, "{violation}"),
        }
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Why the execution stopped.
    pub termination: Termination,
    /// The bug found, if any.
    pub bug: Option<BugKind>,
    /// Every decision made.
    pub trace: ScheduleTrace,
    /// The recorded causal model.
    pub model: ProgramModel,
    /// Final state of every monitor.
    pub monitors: Vec<MonitorSnapshot>,
}

impl ExecutionReport {
    /// Number of decisions made.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.trace.len()
    }
}

struct Envelope {
    id: MessageId,
    event: Event,
}

enum Outgoing {
    Send {
        to: ActorId,
        message: MessageId,
        event: Event,
    },
    Create {
        target: ActorId,
    },
}

struct ActorSlot {
    actor: Option<Box<dyn Actor>>,
    name: String,
    inbox: VecDeque<Envelope>,
    outbox: VecDeque<Outgoing>,
    created: bool,
    started: bool,
    halted: bool,
    signature: Signature,
}

impl ActorSlot {
    fn new(actor: Option<Box<dyn Actor>>, name: String) -> Self {
        let signature = actor
            .as_ref()
            .map_or_else(Signature::default, |a| a.state_signature());
        Self {
            actor,
            name,
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
            created: false,
            started: false,
            halted: false,
            signature,
        }
    }

    /// Logical state including undelivered and unsent messages.
    fn abstract_signature(&self) -> Signature {
        let mut builder = Signature::builder()
            .with_signature(self.signature)
            .with(&(self.started, self.halted));
        for envelope in &self.inbox {
            builder = builder.with_signature(envelope.event.signature());
        }
        for outgoing in &self.outbox {
            builder = match outgoing {
                Outgoing::Send { to, event, .. } => builder
                    .with(&to.as_u64())
                    .with_signature(event.signature()),
                Outgoing::Create { target } => builder.with(&target.as_u64()),
            };
        }
        builder.finish()
    }
}

struct MonitorSlot {
    id: MonitorId,
    monitor: Box<dyn Monitor>,
    status: MonitorStatus,
}

impl MonitorSlot {
    fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            id: self.id,
            name: self.monitor.name().to_owned(),
            status: self.status,
            signature: self.monitor.state_signature(),
        }
    }
}

/// Mutable state of one execution, shared between the scheduler loop and
/// running handlers.
pub(crate) struct Core {
    slots: Vec<ActorSlot>,
    monitors: Vec<MonitorSlot>,
    trace: ScheduleTrace,
    model: ProgramModel,
    next_message: u64,
    bug: Option<BugKind>,
    exhausted: bool,
}

impl Core {
    fn new(monitors: Vec<Box<dyn Monitor>>, connect_successive_handlers: bool) -> Self {
        let mut harness = ActorSlot::new(None, "Harness".to_owned());
        harness.created = true;
        harness.started = true;
        let mut core = Self {
            slots: vec![harness],
            monitors: Vec::new(),
            trace: ScheduleTrace::new(),
            model: ProgramModel::new(ActorId::HARNESS, connect_successive_handlers),
            next_message: 0,
            bug: None,
            exhausted: false,
        };
        for (index, monitor) in monitors.into_iter().enumerate() {
            let id = MonitorId::new(u32::try_from(index).unwrap_or(u32::MAX));
            let status = monitor.status();
            if status.is_hot() {
                core.model.record_monitor_status(id, status);
            }
            core.monitors.push(MonitorSlot {
                id,
                monitor,
                status,
            });
        }
        core
    }

    fn is_stopped(&self) -> bool {
        self.bug.is_some() || self.exhausted
    }

    fn slot(&self, id: ActorId) -> Option<&ActorSlot> {
        self.slots.get(id.index())
    }

    fn pending_operation(&self, id: ActorId) -> Option<Schedulable> {
        let slot = self.slot(id)?;
        if !slot.created || (slot.halted && slot.outbox.is_empty()) {
            return None;
        }
        if !slot.started {
            return Some(
                Schedulable::new(id, OperationKind::Start)
                    .with_signature(Signature::of(slot.name.as_str())),
            );
        }
        let op = match slot.outbox.front() {
            Some(Outgoing::Send { to, message, event }) => {
                Schedulable::new(id, OperationKind::Send)
                    .with_target(*to)
                    .with_message(*message)
                    .with_signature(event.signature())
            }
            Some(Outgoing::Create { target }) => {
                let name = self.slot(*target).map_or("", |s| s.name.as_str());
                Schedulable::new(id, OperationKind::Create)
                    .with_target(*target)
                    .with_signature(Signature::of(name))
            }
            None => match slot.inbox.front() {
                Some(envelope) if !slot.halted && slot.actor.is_some() => {
                    Schedulable::new(id, OperationKind::Receive)
                        .with_message(envelope.id)
                        .with_signature(envelope.event.signature())
                }
                _ => Schedulable::new(id, OperationKind::Receive).disabled(),
            },
        };
        Some(op)
    }

    fn operations(&self) -> Vec<Schedulable> {
        (0..self.slots.len())
            .filter_map(|index| self.pending_operation(ActorId::new(index as u64)))
            .collect()
    }

    fn program_state(&self, ops: &[Schedulable]) -> ProgramState {
        ProgramState {
            actors: self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.created)
                .map(|(index, slot)| (ActorId::new(index as u64), slot.abstract_signature()))
                .collect(),
            enabled: enabled_ids(ops),
            monitors: self.monitors.iter().map(MonitorSlot::snapshot).collect(),
        }
    }

    fn observe(&mut self, strategy: &mut dyn SchedulingStrategy) {
        let ops = self.operations();
        let state = self.program_state(&ops);
        if let Err(violation) = strategy.observe_state(&self.trace, &state) {
            self.report_liveness(violation);
        }
    }

    pub(crate) fn queue_send(&mut self, from: ActorId, to: ActorId, event: Event) {
        let message = MessageId::new(self.next_message);
        self.next_message += 1;
        if let Some(slot) = self.slots.get_mut(from.index()) {
            slot.outbox.push_back(Outgoing::Send { to, message, event });
        }
    }

    pub(crate) fn queue_create(&mut self, from: ActorId, actor: Box<dyn Actor>) -> ActorId {
        let target = ActorId::new(self.slots.len() as u64);
        let name = actor.name().to_owned();
        self.slots.push(ActorSlot::new(Some(actor), name));
        if let Some(slot) = self.slots.get_mut(from.index()) {
            slot.outbox.push_back(Outgoing::Create { target });
        }
        target
    }

    pub(crate) fn choose_boolean(
        &mut self,
        strategy: &mut dyn SchedulingStrategy,
        actor: ActorId,
        fair_choice: Option<&str>,
    ) -> bool {
        if self.is_stopped() {
            return false;
        }
        let Some(value) = strategy.next_boolean(2) else {
            self.exhausted = true;
            return false;
        };
        let index = match fair_choice {
            Some(choice_id) => self.trace.add_fair_boolean_choice(choice_id, value),
            None => self.trace.add_boolean_choice(value),
        };
        self.model
            .record_step(ProgramStep::boolean(actor, value).at_schedule_index(index));
        self.observe(strategy);
        value
    }

    pub(crate) fn choose_integer(
        &mut self,
        strategy: &mut dyn SchedulingStrategy,
        actor: ActorId,
        max: u32,
    ) -> u32 {
        if self.is_stopped() {
            return 0;
        }
        let Some(value) = strategy.next_integer(max) else {
            self.exhausted = true;
            return 0;
        };
        let index = self.trace.add_integer_choice(value);
        self.model
            .record_step(ProgramStep::integer(actor, value).at_schedule_index(index));
        self.observe(strategy);
        value
    }

    pub(crate) fn notify_monitor(&mut self, id: MonitorId, event: &Event) {
        let Some(slot) = self.monitors.get_mut(id.index()) else {
            debug!(monitor = %id, "event for unknown monitor ignored");
            return;
        };
        slot.monitor.on_event(event);
        self.model.record_monitor_event(id);
        let status = slot.monitor.status();
        if status != slot.status {
            slot.status = status;
            self.model.record_monitor_status(id, status);
        }
    }

    pub(crate) fn report_assertion(&mut self, actor: ActorId, message: String) {
        if self.bug.is_none() {
            debug!(actor = %actor, %message, "assertion failed");
            self.bug = Some(BugKind::Assertion { actor, message });
        }
    }

    fn report_liveness(&mut self, violation: LivenessViolation) {
        if self.bug.is_none() {
            debug!(%violation, "liveness violation");
            self.bug = Some(BugKind::Liveness(violation));
        }
    }

    pub(crate) fn halt(&mut self, id: ActorId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.halted = true;
        }
    }

    fn run_handler(
        &mut self,
        strategy: &mut dyn SchedulingStrategy,
        id: ActorId,
        event: Option<&Event>,
    ) {
        let Some(mut actor) = self.slots.get_mut(id.index()).and_then(|s| s.actor.take()) else {
            return;
        };
        {
            let mut cx = ActorContext::new(self, strategy, id);
            match event {
                Some(event) => actor.on_event(event, &mut cx),
                None => actor.on_start(&mut cx),
            }
        }
        let slot = &mut self.slots[id.index()];
        slot.signature = actor.state_signature();
        slot.actor = Some(actor);
    }

    fn execute(&mut self, strategy: &mut dyn SchedulingStrategy, op: &Schedulable) {
        let index = self.trace.len().saturating_sub(1);
        let step = self
            .model
            .record_step(ProgramStep::scheduled(op).at_schedule_index(index));
        let id = op.id;
        match op.kind {
            OperationKind::Start => {
                self.slots[id.index()].started = true;
                self.run_handler(strategy, id, None);
            }
            OperationKind::Create => {
                if let Some(Outgoing::Create { target }) = self.slots[id.index()].outbox.pop_front() {
                    self.slots[target.index()].created = true;
                }
            }
            OperationKind::Send => {
                let Some(Outgoing::Send { to, message, event }) =
                    self.slots[id.index()].outbox.pop_front()
                else {
                    return;
                };
                let receiver_alive = self.slot(to).is_some_and(|s| !s.halted);
                if receiver_alive && strategy.should_deliver(op) {
                    self.slots[to.index()]
                        .inbox
                        .push_back(Envelope { id: message, event });
                } else {
                    trace!(from = %id, to = %to, message = %message, "send dropped");
                    strategy.on_send_dropped(op);
                    if let Some(step) = step {
                        self.model.record_send_dropped(step);
                    }
                }
            }
            OperationKind::Receive => {
                if let Some(envelope) = self.slots[id.index()].inbox.pop_front() {
                    self.run_handler(strategy, id, Some(&envelope.event));
                }
            }
            _ => {}
        }
    }

    fn check_hot_at_termination(&mut self) {
        let hot = self
            .monitors
            .iter()
            .find(|slot| slot.status.is_hot())
            .map(MonitorSlot::snapshot);
        if let Some(snapshot) = hot {
            self.report_liveness(LivenessViolation {
                monitor: snapshot.id,
                name: snapshot.name,
                kind: ViolationKind::HotAtTermination,
                temperature: 0,
                threshold: 0,
            });
        }
    }

    fn finish(mut self, termination: Termination) -> ExecutionReport {
        match &self.bug {
            Some(BugKind::Liveness(violation)) => {
                self.model
                    .record_liveness_bug(violation.monitor, &violation.name);
            }
            Some(BugKind::Assertion { .. }) => self.model.record_safety_bug(),
            None => {}
        }
        ExecutionReport {
            termination,
            bug: self.bug,
            monitors: self.monitors.iter().map(MonitorSlot::snapshot).collect(),
            trace: self.trace,
            model: self.model,
        }
    }
}

/// Runs `program` once under `strategy`.
///
/// The harness's [`Program::setup`] runs first as the root step; then the
/// strategy schedules operations until the program is quiescent, a bug is
/// found, the strategy's step bound is reached, or the strategy declines.
///
/// # Errors
///
/// Returns [`Error::NotEnabled`] if the strategy picks an actor without an
/// enabled operation.
pub fn execute(
    program: &dyn Program,
    strategy: &mut dyn SchedulingStrategy,
    connect_successive_handlers: bool,
) -> Result<ExecutionReport> {
    let _span = debug_span!("execution", strategy = %strategy.description()).entered();
    let mut core = Core::new(program.monitors(), connect_successive_handlers);
    {
        let mut cx = ActorContext::new(&mut core, strategy, ActorId::HARNESS);
        program.setup(&mut cx);
    }

    let mut current = ActorId::HARNESS;
    let termination = loop {
        if core.bug.is_some() {
            break Termination::BugFound;
        }
        if core.exhausted {
            break Termination::StrategyExhausted;
        }
        let ops = core.operations();
        if !ops.iter().any(|op| op.enabled) {
            core.check_hot_at_termination();
            if core.bug.is_some() {
                break Termination::BugFound;
            }
            break Termination::Quiescent;
        }
        if strategy.has_reached_max_scheduling_steps() {
            break Termination::StepBound;
        }
        let Some(chosen) = strategy.next_operation(&ops, current) else {
            break Termination::StrategyExhausted;
        };
        let Some(op) = ops.iter().find(|op| op.enabled && op.id == chosen).cloned() else {
            return Err(Error::NotEnabled { chosen });
        };

        core.trace.add_scheduling_choice(chosen);
        let state = core.program_state(&ops);
        if let Err(violation) = strategy.observe_state(&core.trace, &state) {
            core.report_liveness(violation);
            break Termination::BugFound;
        }
        trace!(step = core.trace.len(), actor = %chosen, op = op.kind.as_str(), "scheduled");
        current = chosen;
        core.execute(strategy, &op);
    };

    debug!(steps = core.trace.len(), ?termination, "execution finished");
    Ok(core.finish(termination))
}
