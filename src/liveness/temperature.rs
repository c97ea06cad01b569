//! Temperature-bounded liveness checking.
//!
//! The cheap heuristic: every monitor that stays hot accumulates
//! temperature, one degree per decision, and any monitor whose temperature
//! exceeds the threshold is reported. It never proves an infinite
//! execution exists; it only bounds how long a property may stay pending.

use crate::error::Result;
use crate::liveness::monitor::{LivenessViolation, MonitorStatus, ViolationKind};
use crate::schedule::{ProgramState, Schedulable, SchedulingStrategy};
use crate::trace::ScheduleTrace;
use crate::tracing_compat::debug;
use crate::types::{ActorId, MonitorId};
use std::collections::BTreeMap;

/// Wraps a strategy and bounds how long monitors may stay hot.
#[derive(Debug)]
pub struct TemperatureCheckingStrategy<S> {
    inner: S,
    threshold: usize,
    temperatures: BTreeMap<MonitorId, usize>,
}

impl<S: SchedulingStrategy> TemperatureCheckingStrategy<S> {
    /// Wraps `inner`, reporting monitors hot for more than `threshold` decisions.
    #[must_use]
    pub fn new(inner: S, threshold: usize) -> Self {
        Self {
            inner,
            threshold,
            temperatures: BTreeMap::new(),
        }
    }

    /// Current temperature of `monitor`.
    #[must_use]
    pub fn temperature(&self, monitor: MonitorId) -> usize {
        self.temperatures.get(&monitor).copied().unwrap_or(0)
    }

    /// The wrapped strategy.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SchedulingStrategy> SchedulingStrategy for TemperatureCheckingStrategy<S> {
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId> {
        self.inner.next_operation(ops, current)
    }

    fn next_boolean(&mut self, max_value: u32) -> Option<bool> {
        self.inner.next_boolean(max_value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        self.inner.next_integer(max_value)
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
        if !self.inner.is_fair() {
            return Ok(());
        }

        for monitor in &state.monitors {
            let temperature = self.temperatures.entry(monitor.id).or_insert(0);
            match monitor.status {
                MonitorStatus::Hot => *temperature += 1,
                MonitorStatus::Cold | MonitorStatus::Neutral => *temperature = 0,
            }
            let temperature = *temperature;
            if temperature > self.threshold {
                debug!(monitor = %monitor.id, temperature, "monitor exceeded liveness temperature");
            }
            monitor.check_liveness_temperature(
                temperature,
                self.threshold,
                ViolationKind::TemperatureExceeded,
            )?;
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
        self.temperatures.clear();
        self.inner.prepare_for_next_iteration()
    }

    fn reset(&mut self) {
        self.temperatures.clear();
        self.inner.reset();
    }

    fn scheduled_steps(&self) -> usize {
        self.inner.scheduled_steps()
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        self.inner.has_reached_max_scheduling_steps()
    }

    fn is_fair(&self) -> bool {
        self.inner.is_fair()
    }

    fn description(&self) -> String {
        format!(
            "temperature[threshold '{}'] over {}",
            self.threshold,
            self.inner.description()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::monitor::MonitorSnapshot;
    use crate::schedule::{PctStrategy, RandomStrategy};
    use crate::state::fingerprint::Signature;
    use crate::test_utils::init_test_logging;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn state(status: MonitorStatus) -> ProgramState {
        ProgramState {
            monitors: vec![MonitorSnapshot {
                id: MonitorId::new(0),
                name: "Progress".into(),
                status,
                signature: Signature::of(&status),
            }],
            ..ProgramState::default()
        }
    }

    #[test]
    fn temperature_rises_while_hot_and_resets_on_cold() {
        init_test("temperature_rises_while_hot_and_resets_on_cold");
        let mut strategy = TemperatureCheckingStrategy::new(RandomStrategy::new(1, 0), 100);
        let trace = ScheduleTrace::new();
        for expected in 1..=5 {
            strategy
                .observe_state(&trace, &state(MonitorStatus::Hot))
                .expect("below threshold");
            crate::assert_with_log!(
                strategy.temperature(MonitorId::new(0)) == expected,
                "temperature",
                expected,
                strategy.temperature(MonitorId::new(0))
            );
        }
        strategy
            .observe_state(&trace, &state(MonitorStatus::Cold))
            .expect("cold");
        assert_eq!(strategy.temperature(MonitorId::new(0)), 0);
        crate::test_complete!("temperature_rises_while_hot_and_resets_on_cold");
    }

    #[test]
    fn exceeding_threshold_is_a_violation() {
        init_test("exceeding_threshold_is_a_violation");
        let mut strategy = TemperatureCheckingStrategy::new(RandomStrategy::new(1, 0), 3);
        let trace = ScheduleTrace::new();
        for _ in 0..3 {
            strategy
                .observe_state(&trace, &state(MonitorStatus::Hot))
                .expect("at threshold");
        }
        let violation = strategy
            .observe_state(&trace, &state(MonitorStatus::Hot))
            .expect_err("over threshold");
        assert_eq!(violation.kind, ViolationKind::TemperatureExceeded);
        assert_eq!(violation.temperature, 4);
        crate::test_complete!("exceeding_threshold_is_a_violation");
    }

    #[test]
    fn unfair_inner_strategy_disables_checking() {
        init_test("unfair_inner_strategy_disables_checking");
        let mut strategy = TemperatureCheckingStrategy::new(PctStrategy::new(1, 2, 0), 1);
        let trace = ScheduleTrace::new();
        for _ in 0..10 {
            strategy
                .observe_state(&trace, &state(MonitorStatus::Hot))
                .expect("pct is unfair, so temperature is not tracked");
        }
        assert_eq!(strategy.temperature(MonitorId::new(0)), 0);
        crate::test_complete!("unfair_inner_strategy_disables_checking");
    }

    #[test]
    fn next_iteration_clears_temperatures() {
        init_test("next_iteration_clears_temperatures");
        let mut strategy = TemperatureCheckingStrategy::new(RandomStrategy::new(1, 0), 100);
        let trace = ScheduleTrace::new();
        strategy
            .observe_state(&trace, &state(MonitorStatus::Hot))
            .expect("hot");
        assert!(strategy.prepare_for_next_iteration());
        assert_eq!(strategy.temperature(MonitorId::new(0)), 0);
        crate::test_complete!("next_iteration_clears_temperatures");
    }
}
