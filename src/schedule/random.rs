//! Uniform random scheduling.

use crate::error::Result;
use crate::schedule::bound_reached;
use crate::schedule::schedulable::{enabled_ops, Schedulable};
use crate::schedule::strategy::SchedulingStrategy;
use crate::types::ActorId;
use crate::util::DetRng;

/// Picks uniformly among enabled operations.
///
/// Random scheduling is fair with probability one, which makes it the usual
/// base for liveness checking.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    rng: DetRng,
    seed: u64,
    max_steps: usize,
    scheduled_steps: usize,
}

impl RandomStrategy {
    /// Creates a random strategy. A `max_steps` of 0 means unbounded.
    #[must_use]
    pub const fn new(seed: u64, max_steps: usize) -> Self {
        Self {
            rng: DetRng::new(seed),
            seed,
            max_steps,
            scheduled_steps: 0,
        }
    }
}

impl SchedulingStrategy for RandomStrategy {
    fn next_operation(&mut self, ops: &[Schedulable], _current: ActorId) -> Option<ActorId> {
        let enabled: Vec<&Schedulable> = enabled_ops(ops).collect();
        if enabled.is_empty() {
            return None;
        }
        let chosen = enabled[self.rng.next_usize(enabled.len())].id;
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
        self.scheduled_steps = 0;
        true
    }

    fn reset(&mut self) {
        self.rng = DetRng::new(self.seed);
        self.scheduled_steps = 0;
    }

    fn scheduled_steps(&self) -> usize {
        self.scheduled_steps
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        bound_reached(self.scheduled_steps, self.max_steps)
    }

    fn is_fair(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        format!("random[seed '{}']", self.seed)
    }
}
