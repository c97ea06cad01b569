//! Test utilities for actorcheck.
//!
//! Shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Small actor programs used across modules

use crate::lab::actor::{Actor, ActorContext, Event};
use crate::liveness::monitor::{Monitor, MonitorStatus};
use crate::state::fingerprint::Signature;
use crate::types::ActorId;
use std::sync::{Mutex, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize trace-level test logging.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// An actor that bounces a `Ping` back to whoever sent it, forever.
#[derive(Debug, Default)]
pub struct PingPong {
    pub peer: Option<ActorId>,
    pub bounces: u64,
}

impl Actor for PingPong {
    fn name(&self) -> &str {
        "PingPong"
    }

    fn on_event(&mut self, event: &Event, cx: &mut ActorContext<'_>) {
        if event.name() == "Peer" {
            self.peer = event.actor(0);
            if let Some(peer) = self.peer {
                cx.send(peer, Event::new("Ping"));
            }
            return;
        }
        self.bounces += 1;
        if let Some(peer) = self.peer {
            cx.send(peer, Event::new("Ping"));
        }
    }

    // bounce count excluded so that the loop revisits the same state
    fn state_signature(&self) -> Signature {
        Signature::of(&self.peer.is_some())
    }
}

/// A monitor that goes hot on `Request` and cold on `Response`.
#[derive(Debug, Default)]
pub struct ProgressMonitor {
    pub hot: bool,
}

impl Monitor for ProgressMonitor {
    fn name(&self) -> &str {
        "ProgressMonitor"
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
