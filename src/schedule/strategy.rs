//! The scheduling strategy contract.
//!
//! A [`SchedulingStrategy`] makes every decision in an iteration: which
//! enabled actor runs next and what each nondeterministic choice returns.
//! Strategies compose by wrapping; liveness checkers and replayers delegate
//! to an inner strategy for whatever they do not decide themselves.
//!
//! # Lifecycle
//!
//! ```text
//! loop per iteration:
//!     next_operation / next_boolean / next_integer   (many times)
//!     observe_state                                   (after each decision)
//!     prepare_for_next_iteration                      (false ends exploration)
//! ```

use crate::error::Result;
use crate::liveness::monitor::{LivenessViolation, MonitorSnapshot};
use crate::schedule::schedulable::Schedulable;
use crate::state::fingerprint::{Fingerprint, FingerprintBuilder, Signature};
use crate::trace::ScheduleTrace;
use crate::types::ActorId;
use std::collections::{BTreeMap, BTreeSet};

/// Logical program state handed to strategies after each decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramState {
    /// Signature of every live actor, including its inbox and pending work.
    pub actors: BTreeMap<ActorId, Signature>,
    /// Actors with an enabled operation.
    pub enabled: BTreeSet<ActorId>,
    /// Every monitor, in id order.
    pub monitors: Vec<MonitorSnapshot>,
}

impl ProgramState {
    /// Computes the fingerprint of this state.
    ///
    /// Depends only on actor and monitor signatures, never on the schedule
    /// that reached the state.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::new();
        for (id, signature) in &self.actors {
            builder.actor(id.as_u64(), *signature);
        }
        for monitor in &self.monitors {
            let combined = Signature::builder()
                .with_signature(monitor.signature)
                .with(&monitor.status)
                .finish();
            builder.monitor(u64::from(monitor.id.as_u32()), combined);
        }
        builder.finish()
    }

    /// Snapshots of the monitors currently hot.
    pub fn hot_monitors(&self) -> impl Iterator<Item = &MonitorSnapshot> {
        self.monitors.iter().filter(|m| m.status.is_hot())
    }
}

/// Decides every scheduling and nondeterministic choice of an iteration.
pub trait SchedulingStrategy {
    /// Picks the next actor to run among the enabled operations.
    ///
    /// Returns `None` when the strategy cannot or will not continue, which
    /// ends the iteration. A returned id must belong to an enabled operation.
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId>;

    /// Picks a boolean; `true` with probability `1 / max_value` for random strategies.
    fn next_boolean(&mut self, max_value: u32) -> Option<bool>;

    /// Picks an integer in `[0, max_value)`.
    fn next_integer(&mut self, max_value: u32) -> Option<u32>;

    /// Tells the strategy a decision was made elsewhere, keeping its
    /// internal counters in sync.
    ///
    /// # Errors
    ///
    /// Strategies that cannot follow external decisions return
    /// [`crate::Error::Unsupported`].
    fn force_next_operation(
        &mut self,
        next: ActorId,
        ops: &[Schedulable],
        current: ActorId,
    ) -> Result<()>;

    /// Forced counterpart of [`Self::next_boolean`].
    ///
    /// # Errors
    ///
    /// See [`Self::force_next_operation`].
    fn force_next_boolean(&mut self, max_value: u32, next: bool) -> Result<()>;

    /// Forced counterpart of [`Self::next_integer`].
    ///
    /// # Errors
    ///
    /// See [`Self::force_next_operation`].
    fn force_next_integer(&mut self, max_value: u32, next: u32) -> Result<()>;

    /// Observes the state reached by the most recent decision.
    ///
    /// Called once per trace step, after the step is appended. Liveness
    /// strategies use it to capture fingerprints and track temperatures.
    ///
    /// # Errors
    ///
    /// Returns a [`LivenessViolation`] when a liveness bug is established.
    fn observe_state(
        &mut self,
        _trace: &ScheduleTrace,
        _state: &ProgramState,
    ) -> std::result::Result<(), LivenessViolation> {
        Ok(())
    }

    /// Decides whether a send should be delivered.
    ///
    /// Replay strategies withhold sends that were dropped in the recorded run.
    fn should_deliver(&mut self, _send: &Schedulable) -> bool {
        true
    }

    /// Notifies the strategy that a send was dropped.
    fn on_send_dropped(&mut self, _send: &Schedulable) {}

    /// Prepares for the next iteration. Returns false if exploration is done.
    fn prepare_for_next_iteration(&mut self) -> bool;

    /// Resets the strategy to its initial state.
    fn reset(&mut self);

    /// Number of decisions made in the current iteration.
    fn scheduled_steps(&self) -> usize;

    /// Returns true once the step bound for this iteration is reached.
    fn has_reached_max_scheduling_steps(&self) -> bool;

    /// Returns true if the strategy eventually schedules every continuously
    /// enabled actor.
    fn is_fair(&self) -> bool;

    /// Human-readable description.
    fn description(&self) -> String;
}

impl<S: SchedulingStrategy + ?Sized> SchedulingStrategy for Box<S> {
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId> {
        (**self).next_operation(ops, current)
    }

    fn next_boolean(&mut self, max_value: u32) -> Option<bool> {
        (**self).next_boolean(max_value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        (**self).next_integer(max_value)
    }

    fn force_next_operation(
        &mut self,
        next: ActorId,
        ops: &[Schedulable],
        current: ActorId,
    ) -> Result<()> {
        (**self).force_next_operation(next, ops, current)
    }

    fn force_next_boolean(&mut self, max_value: u32, next: bool) -> Result<()> {
        (**self).force_next_boolean(max_value, next)
    }

    fn force_next_integer(&mut self, max_value: u32, next: u32) -> Result<()> {
        (**self).force_next_integer(max_value, next)
    }

    fn observe_state(
        &mut self,
        trace: &ScheduleTrace,
        state: &ProgramState,
    ) -> std::result::Result<(), LivenessViolation> {
        (**self).observe_state(trace, state)
    }

    fn should_deliver(&mut self, send: &Schedulable) -> bool {
        (**self).should_deliver(send)
    }

    fn on_send_dropped(&mut self, send: &Schedulable) {
        (**self).on_send_dropped(send);
    }

    fn prepare_for_next_iteration(&mut self) -> bool {
        (**self).prepare_for_next_iteration()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn scheduled_steps(&self) -> usize {
        (**self).scheduled_steps()
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        (**self).has_reached_max_scheduling_steps()
    }

    fn is_fair(&self) -> bool {
        (**self).is_fair()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}
