//! Actors, events, and the handler context.
//!
//! An [`Actor`] reacts to [`Event`]s one at a time. Every effect it has on
//! the rest of the program goes through its [`ActorContext`]: sends and
//! creations are buffered as pending operations that the strategy schedules
//! later, and nondeterministic choices are answered by the strategy on the
//! spot.

use super::runtime::Core;
use crate::schedule::strategy::SchedulingStrategy;
use crate::state::fingerprint::Signature;
use crate::types::{ActorId, MonitorId};

/// A message delivered to an actor or a monitor.
///
/// Events carry a name, integer payload, and actor references. The
/// [`signature`](Self::signature) covers the name and integers only: actor
/// ids differ between runs of the same program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: String,
    ints: Vec<i64>,
    actors: Vec<ActorId>,
}

impl Event {
    /// Creates an event with no payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ints: Vec::new(),
            actors: Vec::new(),
        }
    }

    /// Appends an integer to the payload.
    #[must_use]
    pub fn with_int(mut self, value: i64) -> Self {
        self.ints.push(value);
        self
    }

    /// Appends an actor reference to the payload.
    #[must_use]
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actors.push(actor);
        self
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `index`-th integer of the payload.
    #[must_use]
    pub fn int(&self, index: usize) -> Option<i64> {
        self.ints.get(index).copied()
    }

    /// The `index`-th actor reference of the payload.
    #[must_use]
    pub fn actor(&self, index: usize) -> Option<ActorId> {
        self.actors.get(index).copied()
    }

    /// Run-independent signature of the event.
    #[must_use]
    pub fn signature(&self) -> Signature {
        Signature::builder()
            .with(self.name.as_str())
            .with(&self.ints)
            .finish()
    }
}

/// An independently scheduled unit of program state.
pub trait Actor {
    /// Type name, used in reports and as the signature of its creation.
    fn name(&self) -> &str;

    /// Runs once when the actor is started.
    fn on_start(&mut self, _cx: &mut ActorContext<'_>) {}

    /// Handles one dequeued event.
    fn on_event(&mut self, event: &Event, cx: &mut ActorContext<'_>);

    /// Signature of the actor's logical state.
    ///
    /// Two actors with equal signatures are treated as the same abstract
    /// state by cycle detection. Leave out counters that grow without
    /// bound, or no cycle will ever repeat.
    fn state_signature(&self) -> Signature {
        Signature::default()
    }
}

/// What a running handler can do.
pub struct ActorContext<'a> {
    core: &'a mut Core,
    strategy: &'a mut dyn SchedulingStrategy,
    id: ActorId,
}

impl<'a> ActorContext<'a> {
    pub(crate) fn new(
        core: &'a mut Core,
        strategy: &'a mut dyn SchedulingStrategy,
        id: ActorId,
    ) -> Self {
        Self { core, strategy, id }
    }

    /// Id of the running actor.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Queues `event` for delivery to `to`.
    ///
    /// The send becomes a pending operation of this actor; delivery happens
    /// when the strategy schedules it.
    pub fn send(&mut self, to: ActorId, event: Event) {
        self.core.queue_send(self.id, to, event);
    }

    /// Allocates a new actor and queues its creation.
    ///
    /// The returned id is valid immediately and can be handed to other
    /// actors, but the new actor only starts after the creation is scheduled.
    pub fn create(&mut self, actor: Box<dyn Actor>) -> ActorId {
        self.core.queue_create(self.id, actor)
    }

    /// A boolean chosen by the strategy.
    pub fn random_bool(&mut self) -> bool {
        self.core.choose_boolean(self.strategy, self.id, None)
    }

    /// A boolean chosen by the strategy at a fair choice point.
    ///
    /// Cycle detection only accepts a cycle through `choice_id` if the
    /// choice took both values within it.
    pub fn fair_random_bool(&mut self, choice_id: &str) -> bool {
        self.core.choose_boolean(self.strategy, self.id, Some(choice_id))
    }

    /// An integer in `[0, max)` chosen by the strategy.
    pub fn random_int(&mut self, max: u32) -> u32 {
        self.core.choose_integer(self.strategy, self.id, max)
    }

    /// Delivers `event` to a monitor synchronously.
    pub fn notify(&mut self, monitor: MonitorId, event: &Event) {
        self.core.notify_monitor(monitor, event);
    }

    /// Reports a safety bug if `condition` is false.
    pub fn assert(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.core.report_assertion(self.id, message.into());
        }
    }

    /// Halts the running actor once its pending operations are done.
    ///
    /// Later sends to it are dropped.
    pub fn halt(&mut self) {
        self.core.halt(self.id);
    }
}

impl std::fmt::Debug for ActorContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_payload_accessors() {
        let event = Event::new("Increment")
            .with_int(3)
            .with_actor(ActorId::new(4));
        assert_eq!(event.name(), "Increment");
        assert_eq!(event.int(0), Some(3));
        assert_eq!(event.int(1), None);
        assert_eq!(event.actor(0), Some(ActorId::new(4)));
    }

    #[test]
    fn signature_ignores_actor_references() {
        let a = Event::new("Peer").with_actor(ActorId::new(1));
        let b = Event::new("Peer").with_actor(ActorId::new(9));
        assert_eq!(a.signature(), b.signature());
        assert_ne!(
            Event::new("Increment").with_int(1).signature(),
            Event::new("Increment").with_int(2).signature()
        );
        assert_ne!(Event::new("Ping").signature(), Event::new("Pong").signature());
    }
}
