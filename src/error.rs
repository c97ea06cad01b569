//! Error types for actorcheck.
//!
//! Errors are reserved for misuse and infrastructure failures: a strategy
//! asked to do something it cannot, a bad configuration value, a summary
//! that fails to load. Findings of an exploration (assertion failures,
//! liveness violations, replays that do not reproduce) are ordinary values
//! reported through [`crate::lab::explorer`], never `Err`.
//!
//! # Error Categories
//!
//! - **Unsupported**: strategy contract operations a strategy does not offer
//! - **Config**: invalid configuration values or files
//! - **Replay**: recorded schedules or program models that cannot be followed
//! - **Serialization**: summary and trace (de)serialization
//! - **Io**: reading or writing summary files

use crate::types::{ActorId, StepId};

/// Errors that can occur during replay of a recorded schedule or program model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// A recorded decision cannot be applied to the live program.
    #[error("trace is not reproducible at step {step}: {reason}")]
    Unreproducible {
        /// Scheduling step at which replay gave up.
        step: usize,
        /// What did not match.
        reason: String,
    },

    /// No causally ready recorded step matches any enabled live operation.
    #[error("no recorded step is ready to match the live program at step {step}")]
    NoReadyStep {
        /// Scheduling step at which replay gave up.
        step: usize,
    },

    /// A recorded actor was never bound to a live actor.
    #[error("recorded actor {0} has no live counterpart")]
    UnknownActor(ActorId),

    /// The model expected a nondeterministic choice the program did not make,
    /// or vice versa.
    #[error("no recorded choice for the current actor after step {0}")]
    MissingChoice(StepId),
}

/// The main error type for actorcheck operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The strategy does not support the requested operation.
    #[error("{strategy} does not support {operation}")]
    Unsupported {
        /// Strategy description.
        strategy: &'static str,
        /// Rejected operation.
        operation: &'static str,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Replay could not continue.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// A strategy chose an operation that is not enabled.
    #[error("scheduler chose {chosen}, which is not enabled")]
    NotEnabled {
        /// The chosen actor.
        chosen: ActorId,
    },

    /// JSON (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convenience constructor for unsupported operations.
    #[must_use]
    pub const fn unsupported(strategy: &'static str, operation: &'static str) -> Self {
        Self::Unsupported {
            strategy,
            operation,
        }
    }

    /// Returns true if this error came from replay.
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::Replay(_))
    }
}

/// A specialized Result type for actorcheck operations.
pub type Result<T> = std::result::Result<T, Error>;
