//! Round-robin scheduling.

use crate::error::Result;
use crate::schedule::bound_reached;
use crate::schedule::schedulable::{enabled_ids, Schedulable};
use crate::schedule::strategy::SchedulingStrategy;
use crate::types::ActorId;

/// Cycles through enabled actors in id order.
///
/// Boolean choices alternate and integer choices count upward modulo the
/// bound, so every value is eventually produced.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinStrategy {
    last: Option<ActorId>,
    next_bool: bool,
    next_int: u32,
    max_steps: usize,
    scheduled_steps: usize,
}

impl RoundRobinStrategy {
    /// Creates a round-robin strategy. A `max_steps` of 0 means unbounded.
    #[must_use]
    pub const fn new(max_steps: usize) -> Self {
        Self {
            last: None,
            next_bool: true,
            next_int: 0,
            max_steps,
            scheduled_steps: 0,
        }
    }
}

impl SchedulingStrategy for RoundRobinStrategy {
    fn next_operation(&mut self, ops: &[Schedulable], _current: ActorId) -> Option<ActorId> {
        let enabled = enabled_ids(ops);
        let chosen = match self.last {
            Some(last) => enabled
                .range((std::ops::Bound::Excluded(last), std::ops::Bound::Unbounded))
                .next()
                .or_else(|| enabled.iter().next())
                .copied(),
            None => enabled.iter().next().copied(),
        }?;
        self.last = Some(chosen);
        self.scheduled_steps += 1;
        Some(chosen)
    }

    fn next_boolean(&mut self, _max_value: u32) -> Option<bool> {
        let value = self.next_bool;
        self.next_bool = !value;
        self.scheduled_steps += 1;
        Some(value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        let value = if max_value == 0 { 0 } else { self.next_int % max_value };
        self.next_int = self.next_int.wrapping_add(1);
        self.scheduled_steps += 1;
        Some(value)
    }

    fn force_next_operation(
        &mut self,
        next: ActorId,
        _ops: &[Schedulable],
        _current: ActorId,
    ) -> Result<()> {
        self.last = Some(next);
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
        self.last = None;
        self.scheduled_steps = 0;
        true
    }

    fn reset(&mut self) {
        *self = Self::new(self.max_steps);
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
        "round-robin".to_owned()
    }
}
