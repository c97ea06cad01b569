//! Deterministic lab harness for actor programs.
//!
//! The lab provides:
//!
//! - Actors, events, and the handler context
//! - A single-threaded runtime where every scheduling point and every
//!   nondeterministic choice is delegated to a strategy
//! - A testing engine that explores many iterations and reports bugs
//! - A reproduction engine that replays recorded program models
//! - Configuration with environment and TOML overrides

pub mod actor;
pub mod config;
pub mod env_config;
pub mod explorer;
pub mod runtime;

pub use actor::{Actor, ActorContext, Event};
pub use config::{ExplorationConfig, StrategyKind};
pub use explorer::{
    reproduce, FoundBug, Program, ReplayOutcome, Reproduction, TestReport, TestingEngine,
};
pub use runtime::{execute, BugKind, ExecutionReport, Termination};
