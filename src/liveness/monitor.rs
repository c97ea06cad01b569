//! Specification monitors and liveness violations.
//!
//! A monitor observes events that actors notify it of and tracks whether a
//! liveness property is pending. While a monitor is [`MonitorStatus::Hot`]
//! the program owes it progress; a monitor that stays hot forever is a
//! liveness bug.

use crate::lab::actor::Event;
use crate::state::fingerprint::Signature;
use crate::types::MonitorId;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Liveness status of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// Neither hot nor cold.
    #[default]
    Neutral,
    /// A liveness obligation is pending.
    Hot,
    /// The obligation has been discharged.
    Cold,
}

impl MonitorStatus {
    /// Returns true for [`MonitorStatus::Hot`].
    #[must_use]
    pub const fn is_hot(self) -> bool {
        matches!(self, Self::Hot)
    }

    /// Returns true for [`MonitorStatus::Cold`].
    #[must_use]
    pub const fn is_cold(self) -> bool {
        matches!(self, Self::Cold)
    }
}

/// A specification monitor.
///
/// Monitors are passive: they never send events or make choices, they only
/// observe what actors notify them of.
pub trait Monitor {
    /// Stable type name, used in reports and state signatures.
    fn name(&self) -> &str;

    /// Observes one event.
    fn on_event(&mut self, event: &Event);

    /// Current liveness status.
    fn status(&self) -> MonitorStatus;

    /// Signature of the monitor's logical state.
    ///
    /// Defaults to the status alone. Monitors with more state than hot/cold
    /// should override this so that cycle detection can tell states apart.
    fn state_signature(&self) -> Signature {
        Signature::of(&self.status())
    }
}

/// Point-in-time view of one monitor, as seen by scheduling strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSnapshot {
    /// Monitor id.
    pub id: MonitorId,
    /// Monitor type name.
    pub name: String,
    /// Liveness status.
    pub status: MonitorStatus,
    /// Signature of the monitor's logical state.
    pub signature: Signature,
}

impl MonitorSnapshot {
    /// Asks the monitor to check a liveness temperature against a threshold.
    ///
    /// # Errors
    ///
    /// Returns a [`LivenessViolation`] if the monitor is hot and
    /// `temperature` exceeds `threshold`.
    pub fn check_liveness_temperature(
        &self,
        temperature: usize,
        threshold: usize,
        kind: ViolationKind,
    ) -> Result<(), LivenessViolation> {
        if self.status.is_hot() && temperature > threshold {
            return Err(LivenessViolation {
                monitor: self.id,
                name: self.name.clone(),
                kind,
                temperature,
                threshold,
            });
        }
        Ok(())
    }
}

/// How a liveness violation was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// The monitor stayed hot for longer than the temperature threshold.
    TemperatureExceeded,
    /// A fair cycle was replayed with the monitor hot until the threshold.
    FairCycle,
    /// Execution ended while the monitor was hot.
    HotAtTermination,
}

/// A monitor that failed to make progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessViolation {
    /// Violating monitor.
    pub monitor: MonitorId,
    /// Monitor type name.
    pub name: String,
    /// How the violation was established.
    pub kind: ViolationKind,
    /// Temperature when the violation was raised.
    pub temperature: usize,
    /// Threshold that was exceeded.
    pub threshold: usize,
}

impl fmt::Display for LivenessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::TemperatureExceeded => write!(
                f,
                "monitor '{}' ({}) stayed hot for {} steps (threshold {})",
                self.name, self.monitor, self.temperature, self.threshold
            ),
            ViolationKind::FairCycle => write!(
                f,
                "monitor '{}' ({}) is hot in an infinite fair execution",
                self.name, self.monitor
            ),
            ViolationKind::HotAtTermination => write!(
                f,
                "monitor '{}' ({}) detected liveness bug in hot state at the end of program execution",
                self.name, self.monitor
            ),
        }
    }
}
