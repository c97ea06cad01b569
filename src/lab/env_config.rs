//! Environment variable and config file support for [`ExplorationConfig`].
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`iterations(500)`)
//! 2. **Environment variables**: values from `ACTORCHECK_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`ExplorationConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `ACTORCHECK_SEED` | `u64` (decimal or `0x` hex) | `seed` |
//! | `ACTORCHECK_ITERATIONS` | `usize` | `iterations` |
//! | `ACTORCHECK_STRATEGY` | `random` / `round-robin` / `pct` | `strategy` |
//! | `ACTORCHECK_MAX_FAIR_STEPS` | `usize` | `max_fair_steps` |
//! | `ACTORCHECK_MAX_UNFAIR_STEPS` | `usize` | `max_unfair_steps` |
//! | `ACTORCHECK_LIVENESS_TEMPERATURE_THRESHOLD` | `usize` | `liveness_temperature_threshold` |
//! | `ACTORCHECK_CYCLE_DETECTION` | `bool` | `cycle_detection` |
//! | `ACTORCHECK_SAFETY_PREFIX_BOUND` | `usize` | `safety_prefix_bound` |
//! | `ACTORCHECK_CONNECT_SUCCESSIVE_HANDLERS` | `bool` | `connect_successive_handlers` |
//! | `ACTORCHECK_REPRODUCTION_RUNS` | `usize` | `reproduction_runs` |
//! | `ACTORCHECK_PCT_SWITCH_POINTS` | `usize` | `pct_switch_points` |

use super::config::{ExplorationConfig, StrategyKind};
use crate::error::{Error, Result};

/// Environment variable name for the exploration seed.
pub const ENV_SEED: &str = "ACTORCHECK_SEED";
/// Environment variable name for the iteration count.
pub const ENV_ITERATIONS: &str = "ACTORCHECK_ITERATIONS";
/// Environment variable name for the base strategy.
pub const ENV_STRATEGY: &str = "ACTORCHECK_STRATEGY";
/// Environment variable name for the fair step bound.
pub const ENV_MAX_FAIR_STEPS: &str = "ACTORCHECK_MAX_FAIR_STEPS";
/// Environment variable name for the unfair step bound.
pub const ENV_MAX_UNFAIR_STEPS: &str = "ACTORCHECK_MAX_UNFAIR_STEPS";
/// Environment variable name for the liveness temperature threshold.
pub const ENV_LIVENESS_TEMPERATURE_THRESHOLD: &str = "ACTORCHECK_LIVENESS_TEMPERATURE_THRESHOLD";
/// Environment variable name for enabling fair-cycle detection.
pub const ENV_CYCLE_DETECTION: &str = "ACTORCHECK_CYCLE_DETECTION";
/// Environment variable name for the cycle detection safety prefix.
pub const ENV_SAFETY_PREFIX_BOUND: &str = "ACTORCHECK_SAFETY_PREFIX_BOUND";
/// Environment variable name for chaining successive handlers in the model.
pub const ENV_CONNECT_SUCCESSIVE_HANDLERS: &str = "ACTORCHECK_CONNECT_SUCCESSIVE_HANDLERS";
/// Environment variable name for the number of reproduction runs.
pub const ENV_REPRODUCTION_RUNS: &str = "ACTORCHECK_REPRODUCTION_RUNS";
/// Environment variable name for PCT priority change points.
pub const ENV_PCT_SWITCH_POINTS: &str = "ACTORCHECK_PCT_SWITCH_POINTS";

/// Apply environment variable overrides to an [`ExplorationConfig`].
///
/// Only variables that are set in the environment are applied.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if a variable is set but contains an
/// unparseable value.
pub fn apply_env_overrides(config: &mut ExplorationConfig) -> Result<()> {
    if let Some(val) = read_env(ENV_SEED) {
        config.seed = parse_seed(ENV_SEED, &val)?;
    }
    if let Some(val) = read_env(ENV_ITERATIONS) {
        config.iterations = parse_usize(ENV_ITERATIONS, &val)?;
    }
    if let Some(val) = read_env(ENV_STRATEGY) {
        config.strategy = val.parse::<StrategyKind>()?;
    }
    if let Some(val) = read_env(ENV_MAX_FAIR_STEPS) {
        config.max_fair_steps = parse_usize(ENV_MAX_FAIR_STEPS, &val)?;
    }
    if let Some(val) = read_env(ENV_MAX_UNFAIR_STEPS) {
        config.max_unfair_steps = parse_usize(ENV_MAX_UNFAIR_STEPS, &val)?;
    }
    if let Some(val) = read_env(ENV_LIVENESS_TEMPERATURE_THRESHOLD) {
        config.liveness_temperature_threshold =
            parse_usize(ENV_LIVENESS_TEMPERATURE_THRESHOLD, &val)?;
    }
    if let Some(val) = read_env(ENV_CYCLE_DETECTION) {
        config.cycle_detection = parse_bool(ENV_CYCLE_DETECTION, &val)?;
    }
    if let Some(val) = read_env(ENV_SAFETY_PREFIX_BOUND) {
        config.safety_prefix_bound = parse_usize(ENV_SAFETY_PREFIX_BOUND, &val)?;
    }
    if let Some(val) = read_env(ENV_CONNECT_SUCCESSIVE_HANDLERS) {
        config.connect_successive_handlers = parse_bool(ENV_CONNECT_SUCCESSIVE_HANDLERS, &val)?;
    }
    if let Some(val) = read_env(ENV_REPRODUCTION_RUNS) {
        config.reproduction_runs = parse_usize(ENV_REPRODUCTION_RUNS, &val)?;
    }
    if let Some(val) = read_env(ENV_PCT_SWITCH_POINTS) {
        config.pct_switch_points = parse_usize(ENV_PCT_SWITCH_POINTS, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_seed(var_name: &str, val: &str) -> Result<u64> {
    let trimmed = val.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|e| {
        Error::InvalidConfig(format!(
            "invalid value for {var_name}: expected u64 seed, got {val:?} ({e})"
        ))
    })
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        Error::InvalidConfig(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidConfig(format!(
            "invalid value for {var_name}: expected bool (true/false/1/0/yes/no), got {val:?}"
        ))),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable exploration configuration.
///
/// Fields are grouped into TOML tables:
///
/// ```toml
/// [exploration]
/// seed = 7
/// iterations = 1000
/// strategy = "pct"
/// max_fair_steps = 100000
/// max_unfair_steps = 10000
/// pct_switch_points = 3
///
/// [liveness]
/// temperature_threshold = 500
/// cycle_detection = true
/// safety_prefix_bound = 20
///
/// [model]
/// connect_successive_handlers = false
/// reproduction_runs = 10
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ExplorationTomlConfig {
    /// Exploration settings.
    #[serde(default)]
    pub exploration: ExplorationToml,
    /// Liveness checking settings.
    #[serde(default)]
    pub liveness: LivenessToml,
    /// Program model and reproduction settings.
    #[serde(default)]
    pub model: ModelToml,
}

/// Exploration section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ExplorationToml {
    /// Exploration seed.
    pub seed: Option<u64>,
    /// Maximum number of iterations.
    pub iterations: Option<usize>,
    /// Base strategy name.
    pub strategy: Option<String>,
    /// Fair step bound.
    pub max_fair_steps: Option<usize>,
    /// Unfair step bound.
    pub max_unfair_steps: Option<usize>,
    /// PCT priority change points.
    pub pct_switch_points: Option<usize>,
}

/// Liveness section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct LivenessToml {
    /// Liveness temperature threshold (0 = half the fair bound).
    pub temperature_threshold: Option<usize>,
    /// Use fair-cycle detection.
    pub cycle_detection: Option<bool>,
    /// Steps skipped before states are captured.
    pub safety_prefix_bound: Option<usize>,
}

/// Model section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ModelToml {
    /// Chain successive handlers of an actor.
    pub connect_successive_handlers: Option<bool>,
    /// Replays performed by bug reproduction.
    pub reproduction_runs: Option<usize>,
}

/// Apply a parsed TOML config to an [`ExplorationConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for an unknown strategy name.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut ExplorationConfig, toml: &ExplorationTomlConfig) -> Result<()> {
    if let Some(v) = toml.exploration.seed {
        config.seed = v;
    }
    if let Some(v) = toml.exploration.iterations {
        config.iterations = v;
    }
    if let Some(ref v) = toml.exploration.strategy {
        config.strategy = v.parse()?;
    }
    if let Some(v) = toml.exploration.max_fair_steps {
        config.max_fair_steps = v;
    }
    if let Some(v) = toml.exploration.max_unfair_steps {
        config.max_unfair_steps = v;
    }
    if let Some(v) = toml.exploration.pct_switch_points {
        config.pct_switch_points = v;
    }
    if let Some(v) = toml.liveness.temperature_threshold {
        config.liveness_temperature_threshold = v;
    }
    if let Some(v) = toml.liveness.cycle_detection {
        config.cycle_detection = v;
    }
    if let Some(v) = toml.liveness.safety_prefix_bound {
        config.safety_prefix_bound = v;
    }
    if let Some(v) = toml.model.connect_successive_handlers {
        config.connect_successive_handlers = v;
    }
    if let Some(v) = toml.model.reproduction_runs {
        config.reproduction_runs = v;
    }
    Ok(())
}

/// Parse a TOML string into an [`ExplorationTomlConfig`].
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the TOML is malformed.
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<ExplorationTomlConfig> {
    toml::from_str(toml_str)
        .map_err(|e| Error::InvalidConfig(format!("failed to parse TOML config: {e}")))
}

/// Read and parse a TOML file into an [`ExplorationTomlConfig`].
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the file cannot be read or parsed.
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<ExplorationTomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    parse_toml_str(&content)
}

// =========================================================================
// Tests
// =========================================================================
