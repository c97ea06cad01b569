//! Probabilistic concurrency testing (PCT).
//!
//! Actors get random priorities as they are discovered and the highest
//! priority enabled actor always runs. At `depth` randomly chosen steps the
//! running actor is demoted to lowest priority. Bugs of depth `d` are found
//! with probability at least `1 / (n * k^(d-1))`.
//!
//! PCT starves low-priority actors by construction, so it is not fair and
//! liveness checking is disabled on top of it.

use crate::error::Result;
use crate::schedule::bound_reached;
use crate::schedule::schedulable::{enabled_ids, Schedulable};
use crate::schedule::strategy::SchedulingStrategy;
use crate::tracing_compat::trace;
use crate::types::ActorId;
use crate::util::DetRng;
use std::collections::BTreeSet;

/// Priority-based randomized scheduler.
#[derive(Debug, Clone)]
pub struct PctStrategy {
    rng: DetRng,
    seed: u64,
    depth: usize,
    max_steps: usize,
    scheduled_steps: usize,
    max_scheduled_steps: usize,
    priorities: Vec<ActorId>,
    change_points: BTreeSet<usize>,
}

impl PctStrategy {
    /// Creates a PCT strategy with `depth` priority change points per
    /// iteration. A `max_steps` of 0 means unbounded.
    #[must_use]
    pub const fn new(seed: u64, depth: usize, max_steps: usize) -> Self {
        Self {
            rng: DetRng::new(seed),
            seed,
            depth,
            max_steps,
            scheduled_steps: 0,
            max_scheduled_steps: 0,
            priorities: Vec::new(),
            change_points: BTreeSet::new(),
        }
    }

    /// Current priority change points, for reporting.
    #[must_use]
    pub fn change_points(&self) -> &BTreeSet<usize> {
        &self.change_points
    }

    fn highest_priority(&self, enabled: &BTreeSet<ActorId>) -> Option<ActorId> {
        self.priorities.iter().copied().find(|id| enabled.contains(id))
    }

    fn prioritized_choice(&mut self, enabled: &BTreeSet<ActorId>, current: ActorId) -> Option<ActorId> {
        if self.priorities.is_empty() {
            self.priorities.push(current);
        }
        for id in enabled {
            if !self.priorities.contains(id) {
                let slot = self.rng.next_usize(self.priorities.len()) + 1;
                self.priorities.insert(slot, *id);
                trace!(actor = %id, slot, "pct discovered actor");
            }
        }

        if self.change_points.contains(&self.scheduled_steps) {
            if enabled.len() == 1 {
                self.move_change_point_forward();
            } else if let Some(demoted) = self.highest_priority(enabled) {
                self.priorities.retain(|id| *id != demoted);
                self.priorities.push(demoted);
                trace!(actor = %demoted, "pct demoted actor to lowest priority");
            }
        }

        self.highest_priority(enabled)
    }

    fn move_change_point_forward(&mut self) {
        self.change_points.remove(&self.scheduled_steps);
        let mut point = self.scheduled_steps + 1;
        while self.change_points.contains(&point) {
            point += 1;
        }
        self.change_points.insert(point);
    }
}

impl SchedulingStrategy for PctStrategy {
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId> {
        let enabled = enabled_ids(ops);
        if enabled.is_empty() {
            return None;
        }
        let chosen = self.prioritized_choice(&enabled, current)?;
        self.scheduled_steps += 1;
        Some(chosen)
    }

    fn next_boolean(&mut self, max_value: u32) -> Option<bool> {
        let value = self.rng.next_below(max_value) == 0;
        self.scheduled_steps += 1;
        Some(value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        let value = self.rng.next_below(max_value);
        self.scheduled_steps += 1;
        Some(value)
    }

    fn force_next_operation(
        &mut self,
        _next: ActorId,
        _ops: &[Schedulable],
        _current: ActorId,
    ) -> Result<()> {
        self.scheduled_steps += 1;
        Ok(())
    }

    fn force_next_boolean(&mut self, _max_value: u32, _next: bool) -> Result<()> {
        self.scheduled_steps += 1;
        Ok(())
    }

    fn force_next_integer(&mut self, _max_value: u32, _next: u32) -> Result<()> {
        self.scheduled_steps += 1;
        Ok(())
    }

    fn prepare_for_next_iteration(&mut self) -> bool {
        self.max_scheduled_steps = self.max_scheduled_steps.max(self.scheduled_steps);
        self.scheduled_steps = 0;
        self.priorities.clear();
        self.change_points.clear();

        let mut range: Vec<usize> = (0..self.max_scheduled_steps).collect();
        self.rng.shuffle(&mut range);
        self.change_points.extend(range.into_iter().take(self.depth));
        true
    }

    fn reset(&mut self) {
        self.rng = DetRng::new(self.seed);
        self.scheduled_steps = 0;
        self.max_scheduled_steps = 0;
        self.priorities.clear();
        self.change_points.clear();
    }

    fn scheduled_steps(&self) -> usize {
        self.scheduled_steps
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        bound_reached(self.scheduled_steps, self.max_steps)
    }

    fn is_fair(&self) -> bool {
        false
    }

    fn description(&self) -> String {
        let points: Vec<String> = self.change_points.iter().map(ToString::to_string).collect();
        format!(
            "pct[seed '{}', depth '{}', change points [{}]]",
            self.seed,
            self.depth,
            points.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::schedulable::OperationKind;

    fn ops(ids: &[u64]) -> Vec<Schedulable> {
        ids.iter()
            .map(|&i| Schedulable::new(ActorId::new(i), OperationKind::Receive))
            .collect()
    }

    #[test]
    fn without_change_points_the_top_priority_keeps_running() {
        let mut strategy = PctStrategy::new(3, 0, 0);
        let first = strategy.next_operation(&ops(&[0, 1, 2]), ActorId::new(0));
        for _ in 0..20 {
            assert_eq!(strategy.next_operation(&ops(&[0, 1, 2]), ActorId::new(0)), first);
        }
        assert!(!strategy.is_fair());
    }

    #[test]
    fn change_points_are_drawn_from_previous_length() {
        let mut strategy = PctStrategy::new(3, 2, 0);
        for _ in 0..10 {
            strategy.next_operation(&ops(&[0, 1]), ActorId::new(0));
        }
        assert!(strategy.prepare_for_next_iteration());
        assert_eq!(strategy.change_points().len(), 2);
        assert!(strategy.change_points().iter().all(|&p| p < 10));
    }

    #[test]
    fn single_enabled_actor_pushes_change_point_forward() {
        let mut strategy = PctStrategy::new(3, 0, 0);
        strategy.change_points.insert(0);
        strategy.next_operation(&ops(&[0]), ActorId::new(0));
        assert!(strategy.change_points().contains(&1));
        assert!(!strategy.change_points().contains(&0));
    }

    #[test]
    fn change_point_demotes_running_actor() {
        let mut strategy = PctStrategy::new(3, 0, 0);
        let first = strategy
            .next_operation(&ops(&[0, 1]), ActorId::new(0))
            .expect("op");
        strategy.change_points.insert(strategy.scheduled_steps());
        let second = strategy
            .next_operation(&ops(&[0, 1]), ActorId::new(0))
            .expect("op");
        assert_ne!(first, second);
    }
}
