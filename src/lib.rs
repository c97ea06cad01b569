//! Actorcheck: systematic concurrency testing for message-passing actors.
//!
//! # Overview
//!
//! Actorcheck runs an actor program many times under controlled schedules.
//! Every scheduling point and every nondeterministic choice is answered by a
//! pluggable [`SchedulingStrategy`], so an execution is a pure function of
//! the program and the strategy's decisions. Bugs are assertion failures and
//! specification monitors that stay hot forever.
//!
//! # Core Guarantees
//!
//! - **Deterministic executions**: same program, same strategy seed, same run
//! - **Sound liveness**: fair-cycle detection only reports cycles every
//!   enabled actor takes part in
//! - **Faithful reproduction**: a found bug is replayed from its causal
//!   graph, not from a brittle interleaving
//!
//! # Module Structure
//!
//! - [`types`]: Identifier newtypes
//! - [`schedule`]: Strategy contract and basic strategies
//! - [`trace`]: Schedule traces
//! - [`state`]: Fingerprints and the state cache
//! - [`liveness`]: Monitors, temperature checking, and cycle detection
//! - [`model`]: Causal program model and partial-order utilities
//! - [`replay`]: Program-graph replay
//! - [`lab`]: Actor runtime, testing and reproduction engines, configuration
//! - [`util`]: Deterministic RNG and hashing
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod error;
pub mod lab;
pub mod liveness;
pub mod model;
pub mod replay;
pub mod schedule;
pub mod state;
pub mod trace;
pub mod tracing_compat;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, ReplayError, Result};
pub use lab::{
    reproduce, Actor, ActorContext, Event, ExplorationConfig, Program, TestReport, TestingEngine,
};
pub use liveness::{Monitor, MonitorStatus};
pub use model::ProgramModelSummary;
pub use schedule::SchedulingStrategy;
pub use types::{ActorId, MonitorId};
