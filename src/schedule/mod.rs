//! Scheduling strategies.
//!
//! The [`SchedulingStrategy`] trait is the seam every exploration decision
//! goes through. This module provides the trait, the [`Schedulable`]
//! operations strategies choose from, and the base strategies:
//!
//! - [`RandomStrategy`]: uniform random choice, fair
//! - [`RoundRobinStrategy`]: deterministic rotation, fair
//! - [`PctStrategy`]: priority-based randomized testing, unfair
//! - [`ScheduleReplayStrategy`]: replays a recorded [`crate::trace::ScheduleTrace`]
//!
//! Liveness checking wrappers live in [`crate::liveness`]; program-model
//! replay lives in [`crate::replay`].

pub mod pct;
pub mod random;
pub mod replay;
pub mod round_robin;
pub mod schedulable;
pub mod strategy;

pub use pct::PctStrategy;
pub use random::RandomStrategy;
pub use replay::ScheduleReplayStrategy;
pub use round_robin::RoundRobinStrategy;
pub use schedulable::{OperationKind, Schedulable};
pub use strategy::{ProgramState, SchedulingStrategy};

/// Returns true once `steps` reaches `bound`. A bound of 0 means unbounded.
pub(crate) const fn bound_reached(steps: usize, bound: usize) -> bool {
    bound != 0 && steps >= bound
}
