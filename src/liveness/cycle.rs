//! Cycle-detecting liveness checking.
//!
//! The precise checker. After every decision the reached state is captured
//! in a [`StateCache`]. When a fingerprint repeats, the trace between the two
//! occurrences is a candidate cycle: a lasso whose loop, repeated forever,
//! would be an infinite execution. The candidate is kept only if
//!
//! - every actor enabled somewhere in it is also scheduled in it,
//! - every fair boolean choice point in it took both values, and
//! - some monitor is hot in it and never cold in it.
//!
//! The strategy then replays the loop instead of consulting the inner
//! strategy. If the live program refuses to follow the loop, or leaves the
//! loop's states, or a hot monitor cools down, the candidate is abandoned
//! and exploration resumes. If the loop keeps repeating until the liveness
//! temperature exceeds ten times its length, the hot monitors report a
//! violation.
//!
//! # Phases
//!
//! ```text
//! Exploring ──fair hot cycle──▶ ReplayingCycle ──threshold──▶ violation
//!     ▲                              │
//!     └──────────── escape ──────────┘
//! ```

use crate::error::Result;
use crate::liveness::monitor::{LivenessViolation, ViolationKind};
use crate::schedule::schedulable::enabled_ops;
use crate::schedule::{ProgramState, Schedulable, SchedulingStrategy};
use crate::state::cache::{CapturedState, StateCache};
use crate::state::fingerprint::Fingerprint;
use crate::trace::{ScheduleStep, ScheduleStepKind, ScheduleTrace};
use crate::tracing_compat::{debug, trace};
use crate::types::{ActorId, MonitorId};
use crate::util::DetRng;
use std::collections::{BTreeMap, BTreeSet};

/// Alternative cut points tried after the most recent one yields an unfair cycle.
pub const MAX_CUT_RETRIES: usize = 3;

/// Candidate cycles shorter than this are never replayed.
pub const MIN_CYCLE_LEN: usize = 2;

/// Replay temperature allowed per cycle step before monitors are checked.
pub const TEMPERATURE_PER_CYCLE_STEP: usize = 10;

/// Current phase of the cycle detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Decisions come from the inner strategy.
    Exploring,
    /// Decisions replay a fair candidate cycle.
    ReplayingCycle,
}

/// One trace step of a candidate cycle with the state it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStep {
    /// The recorded decision.
    pub step: ScheduleStep,
    /// The state reached by it.
    pub state: CapturedState,
}

/// Returns true if every actor enabled somewhere in `cycle` is scheduled in it.
#[must_use]
pub fn is_scheduling_fair(cycle: &[CycleStep]) -> bool {
    let scheduled: BTreeSet<ActorId> = cycle
        .iter()
        .filter(|s| s.step.kind == ScheduleStepKind::SchedulingChoice)
        .filter_map(|s| s.step.scheduled_actor)
        .collect();
    let enabled: BTreeSet<ActorId> = cycle
        .iter()
        .flat_map(|s| s.state.enabled.iter().copied())
        .collect();
    enabled == scheduled
}

/// Returns true if every fair boolean choice point in `cycle` took both values.
#[must_use]
pub fn is_nondeterminism_fair(cycle: &[CycleStep]) -> bool {
    let mut outcomes: BTreeMap<&str, (bool, bool)> = BTreeMap::new();
    for s in cycle {
        if s.step.kind != ScheduleStepKind::FairNondeterministicChoice {
            continue;
        }
        let (Some(id), Some(value)) = (s.step.nondet_id.as_deref(), s.step.boolean_choice) else {
            continue;
        };
        let seen = outcomes.entry(id).or_insert((false, false));
        if value {
            seen.0 = true;
        } else {
            seen.1 = true;
        }
    }
    outcomes.values().all(|&(took_true, took_false)| took_true && took_false)
}

/// Monitors hot somewhere in `cycle` and cold nowhere in it.
#[must_use]
pub fn hot_monitors_of(cycle: &[CycleStep]) -> BTreeSet<MonitorId> {
    let mut hot = BTreeSet::new();
    let mut cold = BTreeSet::new();
    for s in cycle {
        for &(id, status) in &s.state.monitors {
            if status.is_hot() {
                hot.insert(id);
            } else if status.is_cold() {
                cold.insert(id);
            }
        }
    }
    hot.retain(|id| !cold.contains(id));
    hot
}

/// Wraps a strategy with fair-cycle liveness checking.
#[derive(Debug)]
pub struct CycleDetectionStrategy<S> {
    inner: S,
    cache: StateCache,
    rng: DetRng,
    seed: u64,
    safety_prefix_bound: usize,
    phase: CyclePhase,
    cycle: Vec<CycleStep>,
    cycle_fingerprints: BTreeSet<Fingerprint>,
    hot_monitors: BTreeSet<MonitorId>,
    liveness_temperature: usize,
    temperature_threshold: usize,
    cycle_start: usize,
    cursor: usize,
    replayed_steps: usize,
    escapes: usize,
}

impl<S: SchedulingStrategy> CycleDetectionStrategy<S> {
    /// Wraps `inner`. `seed` drives the choice of alternative cut points.
    #[must_use]
    pub fn new(inner: S, seed: u64) -> Self {
        Self {
            inner,
            cache: StateCache::new(),
            rng: DetRng::new(seed),
            seed,
            safety_prefix_bound: 0,
            phase: CyclePhase::Exploring,
            cycle: Vec::new(),
            cycle_fingerprints: BTreeSet::new(),
            hot_monitors: BTreeSet::new(),
            liveness_temperature: 0,
            temperature_threshold: 0,
            cycle_start: 0,
            cursor: 0,
            replayed_steps: 0,
            escapes: 0,
        }
    }

    /// Skips state capture for the first `bound` trace steps.
    #[must_use]
    pub const fn with_safety_prefix_bound(mut self, bound: usize) -> Self {
        self.safety_prefix_bound = bound;
        self
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Steps of the candidate cycle, empty while exploring.
    #[must_use]
    pub fn cycle(&self) -> &[CycleStep] {
        &self.cycle
    }

    /// Monitors that are hot for the current candidate cycle.
    #[must_use]
    pub fn hot_monitors(&self) -> &BTreeSet<MonitorId> {
        &self.hot_monitors
    }

    /// Distinct fingerprints of the current candidate cycle.
    #[must_use]
    pub fn cycle_fingerprints(&self) -> &BTreeSet<Fingerprint> {
        &self.cycle_fingerprints
    }

    /// Replay temperature of the current candidate cycle.
    #[must_use]
    pub const fn liveness_temperature(&self) -> usize {
        self.liveness_temperature
    }

    /// Temperature above which hot monitors are checked.
    #[must_use]
    pub const fn temperature_threshold(&self) -> usize {
        self.temperature_threshold
    }

    /// Position of the next replayed cycle step.
    #[must_use]
    pub const fn cycle_cursor(&self) -> usize {
        self.cursor
    }

    /// Number of times a candidate cycle was abandoned in this iteration.
    #[must_use]
    pub const fn escapes(&self) -> usize {
        self.escapes
    }

    /// The fingerprint cache.
    #[must_use]
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// The wrapped strategy.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    const fn is_replaying(&self) -> bool {
        matches!(self.phase, CyclePhase::ReplayingCycle)
    }

    fn capture_program_state(&mut self, trace: &ScheduleTrace, state: &ProgramState) {
        if trace.len() < self.safety_prefix_bound {
            return;
        }
        let Some(head) = trace.peek() else {
            return;
        };
        let (fingerprint, existed) = self.cache.capture_state(head, state);
        if existed {
            trace!(step = head.index, %fingerprint, "state repeated, potential infinite execution");
            self.check_liveness_at_trace_cycle(fingerprint, trace);
        }
    }

    /// Builds the candidate cycle from the step after `cut` to the trace head.
    fn slice_cycle(&self, trace: &ScheduleTrace, cut: usize) -> Vec<CycleStep> {
        trace
            .tail(cut + 1)
            .iter()
            .map(|step| CycleStep {
                step: step.clone(),
                state: self.cache.state(step.index).clone(),
            })
            .collect()
    }

    fn is_fair_cycle(cycle: &[CycleStep]) -> bool {
        cycle.len() >= MIN_CYCLE_LEN && is_scheduling_fair(cycle) && is_nondeterminism_fair(cycle)
    }

    fn check_liveness_at_trace_cycle(&mut self, root: Fingerprint, trace: &ScheduleTrace) {
        if !self.cycle.is_empty() {
            return;
        }
        let Some(head) = trace.peek().map(|s| s.index) else {
            return;
        };

        // Earlier occurrences of the repeated state, most recent first.
        let cut_points: Vec<usize> = self
            .cache
            .indices_of(root)
            .iter()
            .rev()
            .copied()
            .filter(|&index| index != head)
            .collect();
        let Some(&latest) = cut_points.first() else {
            return;
        };

        let mut cycle = self.slice_cycle(trace, latest);
        if !Self::is_fair_cycle(&cycle) {
            debug!(cut = latest, len = cycle.len(), "candidate cycle is unfair");
            cycle.clear();
            let mut retries = (cut_points.len() - 1).min(MAX_CUT_RETRIES);
            while retries > 0 {
                let cut = cut_points[1 + self.rng.next_usize(cut_points.len() - 1)];
                let candidate = self.slice_cycle(trace, cut);
                if Self::is_fair_cycle(&candidate) {
                    cycle = candidate;
                    break;
                }
                retries -= 1;
            }
            if cycle.is_empty() {
                return;
            }
        }

        let hot = hot_monitors_of(&cycle);
        if hot.is_empty() {
            trace!(len = cycle.len(), "fair cycle has no hot monitor");
            return;
        }

        self.cycle_start = cycle.iter().map(|s| s.step.index).min().unwrap_or(head);
        self.temperature_threshold = TEMPERATURE_PER_CYCLE_STEP * cycle.len();
        self.cycle_fingerprints = cycle.iter().map(|s| s.state.fingerprint).collect();
        self.hot_monitors = hot;
        self.cycle = cycle;
        self.cursor = 0;
        self.phase = CyclePhase::ReplayingCycle;
        debug!(
            start = self.cycle_start,
            len = self.cycle.len(),
            hot = self.hot_monitors.len(),
            "replaying fair cycle"
        );
    }

    fn check_liveness_temperature(
        &mut self,
        trace: &ScheduleTrace,
        state: &ProgramState,
    ) -> std::result::Result<(), LivenessViolation> {
        let cooled = state
            .monitors
            .iter()
            .any(|m| m.status.is_cold() && self.hot_monitors.contains(&m.id));
        if cooled {
            self.escape("hot monitor transitioned to cold");
            return Ok(());
        }

        // Earlier steps were checked when they were appended.
        if let Some(head) = trace.peek() {
            if head.index > self.cycle_start {
                if let Some(captured) = self.cache.get(head.index) {
                    if !self.cycle_fingerprints.contains(&captured.fingerprint) {
                        self.escape("state does not belong to the cycle");
                        return Ok(());
                    }
                }
            }
        }

        self.liveness_temperature += 1;
        if self.liveness_temperature > self.temperature_threshold {
            for monitor in state.monitors.iter().filter(|m| self.hot_monitors.contains(&m.id)) {
                monitor.check_liveness_temperature(
                    self.liveness_temperature,
                    self.temperature_threshold,
                    ViolationKind::FairCycle,
                )?;
            }
        }
        Ok(())
    }

    fn advance_cursor(&mut self) {
        self.cursor += 1;
        if self.cursor == self.cycle.len() {
            self.cursor = 0;
        }
        self.replayed_steps += 1;
    }

    fn escape(&mut self, reason: &str) {
        debug!(reason, len = self.cycle.len(), "escaped from cycle");
        self.cycle.clear();
        self.cycle_fingerprints.clear();
        self.hot_monitors.clear();
        self.liveness_temperature = 0;
        self.temperature_threshold = 0;
        self.cycle_start = 0;
        self.cursor = 0;
        self.phase = CyclePhase::Exploring;
        self.escapes += 1;
    }

    fn clear_iteration(&mut self) {
        if !self.cycle.is_empty() || self.is_replaying() {
            self.escape("iteration ended");
        }
        self.cache.clear();
        self.replayed_steps = 0;
        self.escapes = 0;
    }
}

impl<S: SchedulingStrategy> SchedulingStrategy for CycleDetectionStrategy<S> {
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId> {
        if !self.is_replaying() {
            return self.inner.next_operation(ops, current);
        }
        if enabled_ops(ops).next().is_none() {
            return None;
        }

        let step = &self.cycle[self.cursor].step;
        if step.kind != ScheduleStepKind::SchedulingChoice {
            self.escape("next step is not a scheduling choice");
            return self.inner.next_operation(ops, current);
        }
        let recorded = step.scheduled_actor;
        let Some(actor) = recorded.filter(|id| enabled_ops(ops).any(|op| op.id == *id)) else {
            self.escape("scheduled actor is not enabled");
            return self.inner.next_operation(ops, current);
        };
        trace!(actor = %actor, cursor = self.cursor, "replaying cycle step");
        self.advance_cursor();
        Some(actor)
    }

    fn next_boolean(&mut self, max_value: u32) -> Option<bool> {
        if !self.is_replaying() {
            return self.inner.next_boolean(max_value);
        }
        let step = &self.cycle[self.cursor].step;
        let Some(value) = step.boolean_choice.filter(|_| !step.is_scheduling_choice()) else {
            self.escape("next step is not a boolean choice");
            return self.inner.next_boolean(max_value);
        };
        self.advance_cursor();
        Some(value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        if !self.is_replaying() {
            return self.inner.next_integer(max_value);
        }
        let step = &self.cycle[self.cursor].step;
        let Some(value) = step
            .integer_choice
            .filter(|_| step.kind == ScheduleStepKind::NondeterministicChoice)
        else {
            self.escape("next step is not an integer choice");
            return self.inner.next_integer(max_value);
        };
        self.advance_cursor();
        Some(value)
    }

    fn force_next_operation(
        &mut self,
        next: ActorId,
        ops: &[Schedulable],
        current: ActorId,
    ) -> Result<()> {
        self.inner.force_next_operation(next, ops, current)
    }

    fn force_next_boolean(&mut self, max_value: u32, next: bool) -> Result<()> {
        self.inner.force_next_boolean(max_value, next)
    }

    fn force_next_integer(&mut self, max_value: u32, next: u32) -> Result<()> {
        self.inner.force_next_integer(max_value, next)
    }

    fn observe_state(
        &mut self,
        trace: &ScheduleTrace,
        state: &ProgramState,
    ) -> std::result::Result<(), LivenessViolation> {
        self.inner.observe_state(trace, state)?;
        if trace.is_empty() || !self.inner.is_fair() {
            return Ok(());
        }
        self.capture_program_state(trace, state);
        if !self.cycle.is_empty() {
            self.check_liveness_temperature(trace, state)?;
        }
        Ok(())
    }

    fn should_deliver(&mut self, send: &Schedulable) -> bool {
        self.inner.should_deliver(send)
    }

    fn on_send_dropped(&mut self, send: &Schedulable) {
        self.inner.on_send_dropped(send);
    }

    fn prepare_for_next_iteration(&mut self) -> bool {
        self.clear_iteration();
        self.inner.prepare_for_next_iteration()
    }

    fn reset(&mut self) {
        self.clear_iteration();
        self.rng = DetRng::new(self.seed);
        self.inner.reset();
    }

    fn scheduled_steps(&self) -> usize {
        self.inner.scheduled_steps() + self.replayed_steps
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        !self.is_replaying() && self.inner.has_reached_max_scheduling_steps()
    }

    fn is_fair(&self) -> bool {
        self.is_replaying() || self.inner.is_fair()
    }

    fn description(&self) -> String {
        format!("cycle-detection over {}", self.inner.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::monitor::{MonitorSnapshot, MonitorStatus};
    use crate::schedule::{OperationKind, RandomStrategy};
    use crate::state::fingerprint::Signature;
    use crate::test_utils::init_test_logging;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    struct Driver {
        trace: ScheduleTrace,
        strategy: CycleDetectionStrategy<RandomStrategy>,
    }

    impl Driver {
        fn new() -> Self {
            Self {
                trace: ScheduleTrace::new(),
                strategy: CycleDetectionStrategy::new(RandomStrategy::new(7, 0), 7),
            }
        }

        fn state(phase: u64, enabled: &[u64], status: MonitorStatus) -> ProgramState {
            let mut state = ProgramState::default();
            state.actors.insert(ActorId::new(1), Signature::of(&phase));
            state.actors.insert(ActorId::new(2), Signature::of(&0u8));
            state.enabled = enabled.iter().map(|&i| ActorId::new(i)).collect();
            state.monitors.push(MonitorSnapshot {
                id: MonitorId::new(0),
                name: "Progress".into(),
                status,
                signature: Signature::of(&status),
            });
            state
        }

        fn schedule(
            &mut self,
            actor: u64,
            phase: u64,
            enabled: &[u64],
            status: MonitorStatus,
        ) -> std::result::Result<(), LivenessViolation> {
            self.trace.add_scheduling_choice(ActorId::new(actor));
            self.strategy
                .observe_state(&self.trace, &Self::state(phase, enabled, status))
        }
    }

    fn ops(ids: &[u64]) -> Vec<Schedulable> {
        ids.iter()
            .map(|&i| Schedulable::new(ActorId::new(i), OperationKind::Receive))
            .collect()
    }

    #[test]
    fn fair_hot_cycle_enters_replay() {
        init_test("fair_hot_cycle_enters_replay");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();

        let strategy = &driver.strategy;
        crate::assert_with_log!(
            strategy.phase() == CyclePhase::ReplayingCycle,
            "phase",
            CyclePhase::ReplayingCycle,
            strategy.phase()
        );
        assert_eq!(strategy.cycle().len(), 2);
        assert_eq!(strategy.temperature_threshold(), 20);
        assert!(strategy.hot_monitors().contains(&MonitorId::new(0)));
        assert!(strategy.is_fair());
        assert!(!strategy.has_reached_max_scheduling_steps());
        crate::test_complete!("fair_hot_cycle_enters_replay");
    }

    #[test]
    fn replay_follows_cycle_in_order() {
        init_test("replay_follows_cycle_in_order");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();

        let picks: Vec<_> = (0..4)
            .filter_map(|_| driver.strategy.next_operation(&ops(&[1, 2]), ActorId::HARNESS))
            .map(ActorId::as_u64)
            .collect();
        assert_eq!(picks, vec![2, 1, 2, 1]);
        assert_eq!(driver.strategy.cycle_cursor(), 0);
        crate::test_complete!("replay_follows_cycle_in_order");
    }

    #[test]
    fn starved_actor_makes_cycle_unfair() {
        init_test("starved_actor_makes_cycle_unfair");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        assert_eq!(driver.strategy.phase(), CyclePhase::Exploring);
        assert!(driver.strategy.cycle().is_empty());
        crate::test_complete!("starved_actor_makes_cycle_unfair");
    }

    #[test]
    fn cold_monitor_means_no_candidate() {
        init_test("cold_monitor_means_no_candidate");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Cold).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        assert_eq!(driver.strategy.phase(), CyclePhase::Exploring);
        crate::test_complete!("cold_monitor_means_no_candidate");
    }

    #[test]
    fn unreproducible_step_escapes_and_clears_state() {
        init_test("unreproducible_step_escapes_and_clears_state");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        assert_eq!(driver.strategy.phase(), CyclePhase::ReplayingCycle);

        // the cycle wants actor 2, which is blocked
        let chosen = driver.strategy.next_operation(&ops(&[1]), ActorId::HARNESS);
        assert_eq!(chosen, Some(ActorId::new(1)));

        let strategy = &driver.strategy;
        assert_eq!(strategy.phase(), CyclePhase::Exploring);
        assert!(strategy.cycle().is_empty());
        assert!(strategy.hot_monitors().is_empty());
        assert!(strategy.cycle_fingerprints().is_empty());
        assert_eq!(strategy.liveness_temperature(), 0);
        assert_eq!(strategy.cycle_cursor(), 0);
        assert_eq!(strategy.escapes(), 1);
        crate::test_complete!("unreproducible_step_escapes_and_clears_state");
    }

    #[test]
    fn cooling_monitor_escapes() {
        init_test("cooling_monitor_escapes");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 7, &[1, 2], MonitorStatus::Cold).unwrap();
        assert_eq!(driver.strategy.phase(), CyclePhase::Exploring);
        assert_eq!(driver.strategy.escapes(), 1);
        crate::test_complete!("cooling_monitor_escapes");
    }

    #[test]
    fn leaving_cycle_states_escapes() {
        init_test("leaving_cycle_states_escapes");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 42, &[1, 2], MonitorStatus::Hot).unwrap();
        assert_eq!(driver.strategy.phase(), CyclePhase::Exploring);
        crate::test_complete!("leaving_cycle_states_escapes");
    }

    #[test]
    fn staying_in_hot_cycle_raises_violation() {
        init_test("staying_in_hot_cycle_raises_violation");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();

        let mut violation = None;
        for round in 0..100u64 {
            let (actor, phase) = if round % 2 == 0 { (2, 1) } else { (1, 0) };
            if let Err(v) = driver.schedule(actor, phase, &[1, 2], MonitorStatus::Hot) {
                violation = Some(v);
                break;
            }
        }
        let violation = violation.expect("violation raised");
        assert_eq!(violation.kind, ViolationKind::FairCycle);
        assert_eq!(violation.monitor, MonitorId::new(0));
        assert_eq!(violation.threshold, 20);
        assert_eq!(violation.temperature, 21);
        crate::test_complete!("staying_in_hot_cycle_raises_violation");
    }

    #[test]
    fn safety_prefix_delays_capture() {
        init_test("safety_prefix_delays_capture");
        let mut driver = Driver::new();
        driver.strategy = CycleDetectionStrategy::new(RandomStrategy::new(7, 0), 7)
            .with_safety_prefix_bound(3);
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        assert!(driver.strategy.cache().is_empty());
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        assert_eq!(driver.strategy.cache().len(), 1);
        assert_eq!(driver.strategy.phase(), CyclePhase::Exploring);
        crate::test_complete!("safety_prefix_delays_capture");
    }

    #[test]
    fn unfair_fair_choice_is_rejected() {
        init_test("unfair_fair_choice_is_rejected");
        let mut trace = ScheduleTrace::new();
        let mut cycle = Vec::new();
        for value in [true, true] {
            let index = trace.add_fair_boolean_choice("retry", value);
            cycle.push(CycleStep {
                step: trace[index].clone(),
                state: CapturedState {
                    step: index,
                    fingerprint: Fingerprint::from_raw(1),
                    enabled: BTreeSet::new(),
                    monitors: Vec::new(),
                },
            });
        }
        assert!(!is_nondeterminism_fair(&cycle));
        cycle[1].step.boolean_choice = Some(false);
        assert!(is_nondeterminism_fair(&cycle));
        crate::test_complete!("unfair_fair_choice_is_rejected");
    }

    #[test]
    fn next_iteration_resets_everything() {
        init_test("next_iteration_resets_everything");
        let mut driver = Driver::new();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(2, 1, &[1, 2], MonitorStatus::Hot).unwrap();
        driver.schedule(1, 0, &[1, 2], MonitorStatus::Hot).unwrap();
        assert!(driver.strategy.prepare_for_next_iteration());
        assert_eq!(driver.strategy.phase(), CyclePhase::Exploring);
        assert!(driver.strategy.cache().is_empty());
        assert_eq!(driver.strategy.escapes(), 0);
        crate::test_complete!("next_iteration_resets_everything");
    }
}
