//! Replay of a recorded schedule trace.
//!
//! [`ScheduleReplayStrategy`] feeds the decisions of a [`ScheduleTrace`]
//! back into a fresh execution. Any mismatch between the trace and the live
//! program stops replay and is kept as a [`ReplayError`]. Once the trace is
//! exhausted an optional suffix strategy takes over, which lets a recorded
//! prefix be extended by further exploration.

use crate::error::{Error, ReplayError, Result};
use crate::liveness::monitor::LivenessViolation;
use crate::schedule::bound_reached;
use crate::schedule::schedulable::{enabled_ops, Schedulable};
use crate::schedule::strategy::{ProgramState, SchedulingStrategy};
use crate::trace::{ScheduleStep, ScheduleStepKind, ScheduleTrace};
use crate::tracing_compat::warn;
use crate::types::ActorId;

/// Replays a recorded schedule trace step by step.
pub struct ScheduleReplayStrategy {
    trace: ScheduleTrace,
    suffix: Option<Box<dyn SchedulingStrategy>>,
    is_fair: bool,
    max_steps: usize,
    scheduled_steps: usize,
    failure: Option<ReplayError>,
}

impl ScheduleReplayStrategy {
    /// Creates a replayer for `trace`. `is_fair` should report the fairness
    /// of the strategy that produced the trace.
    #[must_use]
    pub fn new(trace: ScheduleTrace, is_fair: bool, max_steps: usize) -> Self {
        Self {
            trace,
            suffix: None,
            is_fair,
            max_steps,
            scheduled_steps: 0,
            failure: None,
        }
    }

    /// Continues with `suffix` once the trace is exhausted.
    #[must_use]
    pub fn with_suffix(mut self, suffix: Box<dyn SchedulingStrategy>) -> Self {
        self.suffix = Some(suffix);
        self
    }

    /// Why replay stopped, if it did.
    #[must_use]
    pub fn failure(&self) -> Option<&ReplayError> {
        self.failure.as_ref()
    }

    fn in_suffix(&self) -> bool {
        self.scheduled_steps >= self.trace.len() && self.suffix.is_some()
    }

    fn fail(&mut self, reason: impl Into<String>) {
        let error = ReplayError::Unreproducible {
            step: self.scheduled_steps,
            reason: reason.into(),
        };
        warn!(%error, "schedule replay diverged");
        self.failure = Some(error);
    }

    fn next_recorded(&mut self, scheduling: bool) -> Option<ScheduleStep> {
        if self.failure.is_some() {
            return None;
        }
        let Some(step) = self.trace.get(self.scheduled_steps).cloned() else {
            self.fail("execution is longer than trace");
            return None;
        };
        let is_scheduling = step.kind == ScheduleStepKind::SchedulingChoice;
        if scheduling && !is_scheduling {
            self.fail("next step is not a scheduling choice");
            return None;
        }
        if !scheduling && is_scheduling {
            self.fail("next step is not a nondeterministic choice");
            return None;
        }
        Some(step)
    }
}

impl SchedulingStrategy for ScheduleReplayStrategy {
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId> {
        if self.in_suffix() {
            let chosen = self.suffix.as_mut()?.next_operation(ops, current)?;
            self.scheduled_steps += 1;
            return Some(chosen);
        }
        let step = self.next_recorded(true)?;
        let recorded = step.scheduled_actor?;
        if !enabled_ops(ops).any(|op| op.id == recorded) {
            self.fail(format!("cannot detect id '{recorded}'"));
            return None;
        }
        self.scheduled_steps += 1;
        Some(recorded)
    }

    fn next_boolean(&mut self, max_value: u32) -> Option<bool> {
        if self.in_suffix() {
            let value = self.suffix.as_mut()?.next_boolean(max_value)?;
            self.scheduled_steps += 1;
            return Some(value);
        }
        let step = self.next_recorded(false)?;
        let Some(value) = step.boolean_choice else {
            self.fail("next step is not a nondeterministic boolean choice");
            return None;
        };
        self.scheduled_steps += 1;
        Some(value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        if self.in_suffix() {
            let value = self.suffix.as_mut()?.next_integer(max_value)?;
            self.scheduled_steps += 1;
            return Some(value);
        }
        let step = self.next_recorded(false)?;
        let Some(value) = step.integer_choice else {
            self.fail("next step is not a nondeterministic integer choice");
            return None;
        };
        self.scheduled_steps += 1;
        Some(value)
    }

    fn force_next_operation(
        &mut self,
        _next: ActorId,
        _ops: &[Schedulable],
        _current: ActorId,
    ) -> Result<()> {
        Err(Error::unsupported("schedule-replay", "force_next_operation"))
    }

    fn force_next_boolean(&mut self, _max_value: u32, _next: bool) -> Result<()> {
        Err(Error::unsupported("schedule-replay", "force_next_boolean"))
    }

    fn force_next_integer(&mut self, _max_value: u32, _next: u32) -> Result<()> {
        Err(Error::unsupported("schedule-replay", "force_next_integer"))
    }

    fn observe_state(
        &mut self,
        trace: &ScheduleTrace,
        state: &ProgramState,
    ) -> std::result::Result<(), LivenessViolation> {
        match self.suffix.as_mut() {
            Some(suffix) if self.scheduled_steps > self.trace.len() => {
                suffix.observe_state(trace, state)
            }
            _ => Ok(()),
        }
    }

    fn prepare_for_next_iteration(&mut self) -> bool {
        self.scheduled_steps = 0;
        self.failure = None;
        match self.suffix.as_mut() {
            Some(suffix) => suffix.prepare_for_next_iteration(),
            None => false,
        }
    }

    fn reset(&mut self) {
        self.scheduled_steps = 0;
        self.failure = None;
        if let Some(suffix) = self.suffix.as_mut() {
            suffix.reset();
        }
    }

    fn scheduled_steps(&self) -> usize {
        self.scheduled_steps
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        bound_reached(self.scheduled_steps, self.max_steps)
    }

    fn is_fair(&self) -> bool {
        self.is_fair
    }

    fn description(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("schedule-replay (suffix: {})", suffix.description()),
            None => "schedule-replay".to_owned(),
        }
    }
}

impl std::fmt::Debug for ScheduleReplayStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleReplayStrategy")
            .field("trace_len", &self.trace.len())
            .field("scheduled_steps", &self.scheduled_steps)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::random::RandomStrategy;
    use crate::schedule::schedulable::OperationKind;

    fn ops() -> Vec<Schedulable> {
        vec![
            Schedulable::new(ActorId::new(0), OperationKind::Receive),
            Schedulable::new(ActorId::new(1), OperationKind::Receive),
        ]
    }

    fn recorded() -> ScheduleTrace {
        let mut trace = ScheduleTrace::new();
        trace.add_scheduling_choice(ActorId::new(1));
        trace.add_boolean_choice(true);
        trace.add_integer_choice(7);
        trace.add_scheduling_choice(ActorId::new(0));
        trace
    }

    #[test]
    fn replays_every_decision() {
        let mut strategy = ScheduleReplayStrategy::new(recorded(), true, 0);
        assert_eq!(strategy.next_operation(&ops(), ActorId::HARNESS), Some(ActorId::new(1)));
        assert_eq!(strategy.next_boolean(2), Some(true));
        assert_eq!(strategy.next_integer(10), Some(7));
        assert_eq!(strategy.next_operation(&ops(), ActorId::HARNESS), Some(ActorId::new(0)));
        assert!(strategy.failure().is_none());
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let mut strategy = ScheduleReplayStrategy::new(recorded(), true, 0);
        assert_eq!(strategy.next_boolean(2), None);
        let failure = strategy.failure().expect("failure recorded");
        assert!(failure.to_string().contains("not a nondeterministic choice"));
    }

    #[test]
    fn disabled_recorded_actor_is_reported() {
        let mut strategy = ScheduleReplayStrategy::new(recorded(), true, 0);
        let ops = vec![
            Schedulable::new(ActorId::new(0), OperationKind::Receive),
            Schedulable::new(ActorId::new(1), OperationKind::Receive).disabled(),
        ];
        assert_eq!(strategy.next_operation(&ops, ActorId::HARNESS), None);
        assert!(strategy.failure().expect("failure").to_string().contains("A1"));
    }

    #[test]
    fn longer_execution_fails_without_suffix() {
        let mut trace = ScheduleTrace::new();
        trace.add_scheduling_choice(ActorId::new(0));
        let mut strategy = ScheduleReplayStrategy::new(trace, true, 0);
        assert!(strategy.next_operation(&ops(), ActorId::HARNESS).is_some());
        assert_eq!(strategy.next_operation(&ops(), ActorId::HARNESS), None);
        assert!(strategy
            .failure()
            .expect("failure")
            .to_string()
            .contains("longer than trace"));
    }

    #[test]
    fn suffix_takes_over_after_trace() {
        let mut trace = ScheduleTrace::new();
        trace.add_scheduling_choice(ActorId::new(0));
        let mut strategy = ScheduleReplayStrategy::new(trace, true, 0)
            .with_suffix(Box::new(RandomStrategy::new(1, 0)));
        assert_eq!(strategy.next_operation(&ops(), ActorId::HARNESS), Some(ActorId::new(0)));
        for _ in 0..5 {
            assert!(strategy.next_operation(&ops(), ActorId::HARNESS).is_some());
        }
        assert!(strategy.failure().is_none());
        assert_eq!(strategy.scheduled_steps(), 6);
    }

    #[test]
    fn forcing_is_unsupported() {
        let mut strategy = ScheduleReplayStrategy::new(recorded(), true, 0);
        assert!(matches!(
            strategy.force_next_boolean(2, true),
            Err(Error::Unsupported { .. })
        ));
    }
}
