//! Program-model replay.
//!
//! Reproduces a recorded bug by following the causal order of its
//! [`crate::model::ProgramModelSummary`] in a fresh execution. See
//! [`ProgramGraphReplayStrategy`].

pub mod frontier;
pub mod strategy;
pub mod tie_break;

pub use frontier::{ExactSignature, ReplayCandidate, ReplayFrontier, StepMatcher};
pub use strategy::ProgramGraphReplayStrategy;
pub use tie_break::{RandomTieBreak, TieBreak, TotalOrderTieBreak};
