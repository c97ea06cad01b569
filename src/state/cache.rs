//! Fingerprint cache over a schedule trace.
//!
//! After every decision the cycle detector captures the program state
//! reached by that decision. The cache keeps the captured state per trace
//! index and, per fingerprint, every index that produced it, so "has this
//! abstract state been seen before" is a single hash lookup.

use crate::liveness::monitor::MonitorStatus;
use crate::schedule::ProgramState;
use crate::state::fingerprint::Fingerprint;
use crate::trace::ScheduleStep;
use crate::types::{ActorId, MonitorId};
use crate::util::DetHashMap;
use std::collections::BTreeSet;

/// State captured after one trace step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedState {
    /// Trace index that produced this state.
    pub step: usize,
    /// Fingerprint of the logical state.
    pub fingerprint: Fingerprint,
    /// Actors enabled at this point.
    pub enabled: BTreeSet<ActorId>,
    /// Liveness status of every monitor.
    pub monitors: Vec<(MonitorId, MonitorStatus)>,
}

/// Captured states indexed by trace step and by fingerprint.
#[derive(Debug, Default)]
pub struct StateCache {
    states: DetHashMap<usize, CapturedState>,
    by_fingerprint: DetHashMap<Fingerprint, Vec<usize>>,
}

impl StateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures `state` as the result of `step`.
    ///
    /// Returns the fingerprint and whether it had been captured before at
    /// another trace index.
    ///
    /// # Panics
    ///
    /// Panics if `step` was already captured; each trace step is captured
    /// at most once per iteration.
    pub fn capture_state(&mut self, step: &ScheduleStep, state: &ProgramState) -> (Fingerprint, bool) {
        let fingerprint = state.fingerprint();
        let captured = CapturedState {
            step: step.index,
            fingerprint,
            enabled: state.enabled.clone(),
            monitors: state.monitors.iter().map(|m| (m.id, m.status)).collect(),
        };
        let previous = self.states.insert(step.index, captured);
        assert!(
            previous.is_none(),
            "trace step {} captured twice",
            step.index
        );

        let indices = self.by_fingerprint.entry(fingerprint).or_default();
        indices.push(step.index);
        (fingerprint, indices.len() > 1)
    }

    /// Returns the state captured after trace step `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CapturedState> {
        self.states.get(&index)
    }

    /// Returns the state captured after trace step `index`.
    ///
    /// # Panics
    ///
    /// Panics if the step was never captured. Callers only look up steps
    /// inside a candidate cycle, all of which were captured.
    #[must_use]
    pub fn state(&self, index: usize) -> &CapturedState {
        self.states
            .get(&index)
            .unwrap_or_else(|| panic!("no state captured for trace step {index}"))
    }

    /// Trace indices that produced `fingerprint`, in capture order.
    #[must_use]
    pub fn indices_of(&self, fingerprint: Fingerprint) -> &[usize] {
        self.by_fingerprint
            .get(&fingerprint)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of captured states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drops every captured state.
    pub fn clear(&mut self) {
        self.states.clear();
        self.by_fingerprint.clear();
    }
}
