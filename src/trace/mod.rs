//! Schedule traces recorded during exploration.

pub mod schedule;

pub use schedule::{ScheduleStep, ScheduleStepKind, ScheduleTrace};
