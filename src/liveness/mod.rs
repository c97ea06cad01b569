//! Liveness checking.
//!
//! Monitors express liveness properties as hot/cold states. Two strategy
//! wrappers check them:
//!
//! - [`TemperatureCheckingStrategy`]: bounds how long any monitor may stay hot
//! - [`CycleDetectionStrategy`]: finds fair cycles in which a monitor stays
//!   hot and replays them until the violation is established
//!
//! Both only check anything when the wrapped strategy is fair.

pub mod cycle;
pub mod monitor;
pub mod temperature;

pub use cycle::{CycleDetectionStrategy, CyclePhase, CycleStep};
pub use monitor::{LivenessViolation, Monitor, MonitorSnapshot, MonitorStatus, ViolationKind};
pub use temperature::TemperatureCheckingStrategy;
