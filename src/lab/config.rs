//! Configuration for exploration and reproduction.
//!
//! The exploration configuration controls:
//! - Seed and scheduling strategy
//! - Step bounds for fair and unfair strategies
//! - Liveness checking mode and thresholds
//! - Program model recording and bug reproduction

use crate::error::{Error, Result};
use crate::liveness::{CycleDetectionStrategy, TemperatureCheckingStrategy};
use crate::schedule::{PctStrategy, RandomStrategy, RoundRobinStrategy, SchedulingStrategy};
use std::fmt;
use std::str::FromStr;

/// Which base strategy explores schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Uniformly random choices. Fair.
    #[default]
    Random,
    /// Rotate through enabled actors. Fair.
    RoundRobin,
    /// Probabilistic concurrency testing with priority change points. Unfair.
    Pct,
}

impl StrategyKind {
    /// Returns a stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::RoundRobin => "round-robin",
            Self::Pct => "pct",
        }
    }

    /// Returns true for strategies that schedule every enabled actor eventually.
    #[must_use]
    pub const fn is_fair(self) -> bool {
        !matches!(self, Self::Pct)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "round-robin" | "roundrobin" => Ok(Self::RoundRobin),
            "pct" => Ok(Self::Pct),
            other => Err(Error::InvalidConfig(format!(
                "unknown strategy {other:?}, expected random, round-robin or pct"
            ))),
        }
    }
}

/// Configuration for a testing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationConfig {
    /// Seed for every randomized decision.
    pub seed: u64,
    /// Maximum number of iterations.
    pub iterations: usize,
    /// Base scheduling strategy.
    pub strategy: StrategyKind,
    /// Step bound for fair strategies. `0` means unbounded.
    pub max_fair_steps: usize,
    /// Step bound for unfair strategies.
    pub max_unfair_steps: usize,
    /// Steps a monitor may stay hot before a liveness bug is reported.
    ///
    /// `0` selects half of [`Self::max_fair_steps`].
    pub liveness_temperature_threshold: usize,
    /// Trace steps skipped before cycle detection captures states.
    pub safety_prefix_bound: usize,
    /// Use fair-cycle detection instead of temperature checking.
    pub cycle_detection: bool,
    /// Chain each handler of an actor to its previous handler in the model.
    pub connect_successive_handlers: bool,
    /// Replays performed by bug reproduction.
    pub reproduction_runs: usize,
    /// Priority change points per PCT iteration.
    pub pct_switch_points: usize,
}

impl ExplorationConfig {
    /// Creates a configuration with the given seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            iterations: 100,
            strategy: StrategyKind::Random,
            max_fair_steps: 100_000,
            max_unfair_steps: 10_000,
            liveness_temperature_threshold: 0,
            safety_prefix_bound: 0,
            cycle_detection: false,
            connect_successive_handlers: false,
            reproduction_runs: 10,
            pct_switch_points: 3,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub const fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the base strategy.
    #[must_use]
    pub const fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the fair step bound.
    #[must_use]
    pub const fn max_fair_steps(mut self, steps: usize) -> Self {
        self.max_fair_steps = steps;
        self
    }

    /// Sets the unfair step bound.
    #[must_use]
    pub const fn max_unfair_steps(mut self, steps: usize) -> Self {
        self.max_unfair_steps = steps;
        self
    }

    /// Sets the liveness temperature threshold.
    #[must_use]
    pub const fn liveness_temperature_threshold(mut self, threshold: usize) -> Self {
        self.liveness_temperature_threshold = threshold;
        self
    }

    /// Sets the safety prefix bound for cycle detection.
    #[must_use]
    pub const fn safety_prefix_bound(mut self, bound: usize) -> Self {
        self.safety_prefix_bound = bound;
        self
    }

    /// Enables or disables fair-cycle detection.
    #[must_use]
    pub const fn cycle_detection(mut self, enabled: bool) -> Self {
        self.cycle_detection = enabled;
        self
    }

    /// Sets whether successive handlers of an actor are chained.
    #[must_use]
    pub const fn connect_successive_handlers(mut self, connect: bool) -> Self {
        self.connect_successive_handlers = connect;
        self
    }

    /// Sets the number of reproduction runs.
    #[must_use]
    pub const fn reproduction_runs(mut self, runs: usize) -> Self {
        self.reproduction_runs = runs;
        self
    }

    /// Sets the number of PCT priority change points.
    #[must_use]
    pub const fn pct_switch_points(mut self, points: usize) -> Self {
        self.pct_switch_points = points;
        self
    }

    /// The temperature threshold in effect.
    #[must_use]
    pub const fn effective_temperature_threshold(&self) -> usize {
        if self.liveness_temperature_threshold > 0 {
            self.liveness_temperature_threshold
        } else {
            self.max_fair_steps / 2
        }
    }

    /// Checks the configuration for values no run can use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfig("iterations must be positive".to_owned()));
        }
        if self.reproduction_runs == 0 {
            return Err(Error::InvalidConfig(
                "reproduction_runs must be positive".to_owned(),
            ));
        }
        if !self.strategy.is_fair() && self.max_unfair_steps == 0 {
            return Err(Error::InvalidConfig(format!(
                "{} requires a positive max_unfair_steps",
                self.strategy
            )));
        }
        Ok(())
    }

    /// Builds the configured strategy wrapped in liveness checking.
    #[must_use]
    pub fn build_strategy(&self) -> Box<dyn SchedulingStrategy> {
        let base: Box<dyn SchedulingStrategy> = match self.strategy {
            StrategyKind::Random => Box::new(RandomStrategy::new(self.seed, self.max_fair_steps)),
            StrategyKind::RoundRobin => Box::new(RoundRobinStrategy::new(self.max_fair_steps)),
            StrategyKind::Pct => Box::new(PctStrategy::new(
                self.seed,
                self.pct_switch_points,
                self.max_unfair_steps,
            )),
        };
        if self.cycle_detection {
            Box::new(
                CycleDetectionStrategy::new(base, self.seed)
                    .with_safety_prefix_bound(self.safety_prefix_bound),
            )
        } else {
            Box::new(TemperatureCheckingStrategy::new(
                base,
                self.effective_temperature_threshold(),
            ))
        }
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}
