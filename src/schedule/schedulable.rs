//! Schedulable operations.
//!
//! At every scheduling point each live actor exposes exactly one pending
//! operation. The strategy sees the list of them and picks one enabled
//! actor to run next.

use crate::state::fingerprint::Signature;
use crate::types::{ActorId, MessageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The kind of operation an actor is about to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
    /// Run the actor's start handler.
    Start,
    /// Bring a previously allocated actor to life.
    Create,
    /// Enqueue a message in another actor's inbox.
    Send,
    /// Dequeue the inbox head and run the event handler.
    Receive,
    /// Acquire a shared resource.
    Acquire,
    /// Release a shared resource.
    Release,
    /// Wait for another actor.
    Join,
    /// Give up the processor without other effect.
    Yield,
    /// The actor has halted.
    Stop,
}

impl OperationKind {
    /// Returns a stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Create => "create",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::Join => "join",
            Self::Yield => "yield",
            Self::Stop => "stop",
        }
    }
}

/// One actor's pending operation at a scheduling point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedulable {
    /// Actor owning the operation.
    pub id: ActorId,
    /// Whether the operation can run now.
    pub enabled: bool,
    /// What the operation does.
    pub kind: OperationKind,
    /// For `Send`, the receiver. For `Create`, the actor being created.
    pub target: Option<ActorId>,
    /// For `Send`, the outgoing message. For `Receive`, the inbox head.
    pub message: Option<MessageId>,
    /// Signature of the operation's payload, used by replay matching.
    pub signature: Signature,
}

impl Schedulable {
    /// Creates an enabled operation with no target, message, or payload.
    #[must_use]
    pub fn new(id: ActorId, kind: OperationKind) -> Self {
        Self {
            id,
            enabled: true,
            kind,
            target: None,
            message: None,
            signature: Signature::default(),
        }
    }

    /// Sets the target actor.
    #[must_use]
    pub const fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the message id.
    #[must_use]
    pub const fn with_message(mut self, message: MessageId) -> Self {
        self.message = Some(message);
        self
    }

    /// Sets the payload signature.
    #[must_use]
    pub const fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Marks the operation as disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Ids of the enabled operations, in ascending order.
#[must_use]
pub fn enabled_ids(ops: &[Schedulable]) -> BTreeSet<ActorId> {
    ops.iter().filter(|op| op.enabled).map(|op| op.id).collect()
}

/// Enabled operations, preserving input order.
pub fn enabled_ops(ops: &[Schedulable]) -> impl Iterator<Item = &Schedulable> {
    ops.iter().filter(|op| op.enabled)
}
