//! Core types shared across the crate.

pub mod id;

pub use id::{ActorId, MessageId, MonitorId, StepId};
