#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use actorcheck::lab::{Actor, ActorContext, Event, Program};
use actorcheck::liveness::{Monitor, MonitorStatus};
use actorcheck::state::fingerprint::Signature;
use actorcheck::types::{ActorId, MonitorId};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed used by test helpers.
pub const DEFAULT_TEST_SEED: u64 = 0xDEAD_BEEF;
/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "ACTORCHECK_PROPTEST_SEED";
const PROPTEST_MAX_SHRINK_ITERS_ENV: &str = "ACTORCHECK_PROPTEST_MAX_SHRINK_ITERS";

/// Configuration for property tests with optional deterministic seed support.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Fixed seed for reproducibility (overrides CI default when set).
    pub seed: Option<u64>,
    /// Number of successful cases required.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropertyTestConfig {
    /// Build a config with defaults for property tests.
    #[must_use]
    pub fn new(cases: u32) -> Self {
        Self {
            seed: read_proptest_seed(),
            cases,
            max_shrink_iters: read_max_shrink_iters()
                .unwrap_or(ProptestConfig::default().max_shrink_iters),
        }
    }

    /// Convert into a ProptestConfig, applying deterministic seed rules.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        let mut config = ProptestConfig::with_cases(self.cases);

        // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
        if matches!(config.rng_seed, RngSeed::Random) {
            if let Some(seed) = self.seed {
                config.rng_seed = RngSeed::Fixed(seed);
            }
        }

        config.max_shrink_iters = self.max_shrink_iters;
        config
    }
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).to_proptest_config()
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }

    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }

    None
}

fn read_max_shrink_iters() -> Option<u32> {
    std::env::var(PROPTEST_MAX_SHRINK_ITERS_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

// =============================================================================
// Shared programs
// =============================================================================

/// Appends every received digit and fails on one forbidden number.
#[derive(Debug)]
pub struct Accumulator {
    pub value: i64,
    pub forbidden: Option<i64>,
}

impl Actor for Accumulator {
    fn name(&self) -> &str {
        "Accumulator"
    }

    fn on_event(&mut self, event: &Event, cx: &mut ActorContext<'_>) {
        self.value = self.value * 10 + event.int(0).unwrap_or(0);
        if let Some(forbidden) = self.forbidden {
            cx.assert(self.value != forbidden, format!("reached {forbidden}"));
        }
    }

    fn state_signature(&self) -> Signature {
        Signature::of(&self.value)
    }
}

/// Sends its digits to a target, one send per digit, on start.
#[derive(Debug)]
pub struct DigitSender {
    pub to: ActorId,
    pub digits: Vec<i64>,
}

impl Actor for DigitSender {
    fn name(&self) -> &str {
        "DigitSender"
    }

    fn on_start(&mut self, cx: &mut ActorContext<'_>) {
        for &digit in &self.digits {
            cx.send(self.to, Event::new("Digit").with_int(digit));
        }
    }

    fn on_event(&mut self, _event: &Event, _cx: &mut ActorContext<'_>) {}
}

/// Two senders racing digits into one accumulator.
///
/// Sender A sends `1, 2`; sender B sends `3, 4`. The accumulator fails when
/// it sees the interleaving `3, 1, 4, 2`.
#[derive(Debug, Clone)]
pub struct DigitRace {
    pub forbidden: Option<i64>,
    pub first_digits: Vec<i64>,
}

impl DigitRace {
    /// The racy program with the assertion enabled.
    #[must_use]
    pub fn buggy() -> Self {
        Self {
            forbidden: Some(3142),
            first_digits: vec![1, 2],
        }
    }
}

impl Program for DigitRace {
    fn setup(&self, cx: &mut ActorContext<'_>) {
        let acc = cx.create(Box::new(Accumulator {
            value: 0,
            forbidden: self.forbidden,
        }));
        cx.create(Box::new(DigitSender {
            to: acc,
            digits: self.first_digits.clone(),
        }));
        cx.create(Box::new(DigitSender {
            to: acc,
            digits: vec![3, 4],
        }));
    }

    fn name(&self) -> &str {
        "digit-race"
    }
}

/// A monitor that goes hot on `Request` and cold on `Response`.
#[derive(Debug, Default)]
pub struct ResponseMonitor {
    pub hot: bool,
}

impl Monitor for ResponseMonitor {
    fn name(&self) -> &str {
        "ResponseMonitor"
    }

    fn on_event(&mut self, event: &Event) {
        match event.name() {
            "Request" => self.hot = true,
            "Response" => self.hot = false,
            _ => {}
        }
    }

    fn status(&self) -> MonitorStatus {
        if self.hot {
            MonitorStatus::Hot
        } else {
            MonitorStatus::Cold
        }
    }
}

/// Bounces `Ping` with its peer forever without ever answering the monitor.
#[derive(Debug, Default)]
pub struct Bouncer {
    pub peer: Option<ActorId>,
}

impl Actor for Bouncer {
    fn name(&self) -> &str {
        "Bouncer"
    }

    fn on_event(&mut self, event: &Event, cx: &mut ActorContext<'_>) {
        if event.name() == "Peer" {
            self.peer = event.actor(0);
        }
        if let Some(peer) = self.peer {
            cx.send(peer, Event::new("Ping"));
        }
    }

    fn state_signature(&self) -> Signature {
        Signature::of(&self.peer.is_some())
    }
}

/// A request the program never answers while two actors spin.
#[derive(Debug, Clone, Copy)]
pub struct Starvation;

impl Program for Starvation {
    fn setup(&self, cx: &mut ActorContext<'_>) {
        let a = cx.create(Box::new(Bouncer::default()));
        let b = cx.create(Box::new(Bouncer::default()));
        cx.send(a, Event::new("Peer").with_actor(b));
        cx.send(b, Event::new("Peer").with_actor(a));
        cx.notify(MonitorId::new(0), &Event::new("Request"));
    }

    fn monitors(&self) -> Vec<Box<dyn Monitor>> {
        vec![Box::new(ResponseMonitor::default())]
    }

    fn name(&self) -> &str {
        "starvation"
    }
}

/// Answers every request, then asks the client for another one.
#[derive(Debug, Default)]
pub struct Server;

impl Actor for Server {
    fn name(&self) -> &str {
        "Server"
    }

    fn on_event(&mut self, event: &Event, cx: &mut ActorContext<'_>) {
        if let Some(client) = event.actor(0) {
            cx.notify(MonitorId::new(0), &Event::new("Response"));
            cx.send(client, Event::new("Done"));
        }
    }
}

/// Sends a request on start and after every response.
#[derive(Debug)]
pub struct Client {
    pub server: ActorId,
}

impl Client {
    fn request(&self, cx: &mut ActorContext<'_>) {
        cx.notify(MonitorId::new(0), &Event::new("Request"));
        let me = cx.id();
        cx.send(self.server, Event::new("Request").with_actor(me));
    }
}

impl Actor for Client {
    fn name(&self) -> &str {
        "Client"
    }

    fn on_start(&mut self, cx: &mut ActorContext<'_>) {
        self.request(cx);
    }

    fn on_event(&mut self, _event: &Event, cx: &mut ActorContext<'_>) {
        self.request(cx);
    }
}

/// An endless request/response loop that always makes progress.
#[derive(Debug, Clone, Copy)]
pub struct RequestResponse;

impl Program for RequestResponse {
    fn setup(&self, cx: &mut ActorContext<'_>) {
        let server = cx.create(Box::new(Server));
        cx.create(Box::new(Client { server }));
    }

    fn monitors(&self) -> Vec<Box<dyn Monitor>> {
        vec![Box::new(ResponseMonitor::default())]
    }

    fn name(&self) -> &str {
        "request-response"
    }
}

/// Flips fair coins until both sides came up, spinning a bouncer meanwhile.
#[derive(Debug, Default)]
pub struct CoinFlipper {
    pub seen_true: bool,
    pub seen_false: bool,
}

impl Actor for CoinFlipper {
    fn name(&self) -> &str {
        "CoinFlipper"
    }

    fn on_start(&mut self, cx: &mut ActorContext<'_>) {
        let me = cx.id();
        cx.send(me, Event::new("Flip"));
    }

    fn on_event(&mut self, _event: &Event, cx: &mut ActorContext<'_>) {
        if cx.fair_random_bool("coin") {
            self.seen_true = true;
        } else {
            self.seen_false = true;
        }
        if self.seen_true && self.seen_false {
            cx.notify(MonitorId::new(0), &Event::new("Response"));
            cx.halt();
            return;
        }
        let me = cx.id();
        cx.send(me, Event::new("Flip"));
    }

    fn state_signature(&self) -> Signature {
        Signature::of(&(self.seen_true, self.seen_false))
    }
}

/// A request that is answered once a fair coin has shown both sides.
#[derive(Debug, Clone, Copy)]
pub struct FairCoin;

impl Program for FairCoin {
    fn setup(&self, cx: &mut ActorContext<'_>) {
        cx.notify(MonitorId::new(0), &Event::new("Request"));
        cx.create(Box::new(CoinFlipper::default()));
    }

    fn monitors(&self) -> Vec<Box<dyn Monitor>> {
        vec![Box::new(ResponseMonitor::default())]
    }

    fn name(&self) -> &str {
        "fair-coin"
    }
}
