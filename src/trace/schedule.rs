//! Schedule traces.
//!
//! A [`ScheduleTrace`] is the append-only record of every decision made in
//! one iteration: which actor ran, and which values nondeterministic
//! choices produced. Step indices are dense and equal to the position in
//! the trace, so `trace[i].index == i` always holds.

use crate::error::{Error, Result};
use crate::types::ActorId;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Kind of decision recorded in a trace step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStepKind {
    /// An actor was chosen to run.
    SchedulingChoice,
    /// A boolean or integer choice.
    NondeterministicChoice,
    /// A boolean choice that liveness checking requires to be fair.
    FairNondeterministicChoice,
}

/// One decision in a schedule trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStep {
    /// Position in the trace.
    pub index: usize,
    /// Decision kind.
    pub kind: ScheduleStepKind,
    /// Actor chosen, for scheduling choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_actor: Option<ActorId>,
    /// Boolean value, for boolean choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_choice: Option<bool>,
    /// Integer value, for integer choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer_choice: Option<u32>,
    /// Identity of a fair boolean choice point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nondet_id: Option<String>,
}

impl ScheduleStep {
    fn empty(index: usize, kind: ScheduleStepKind) -> Self {
        Self {
            index,
            kind,
            scheduled_actor: None,
            boolean_choice: None,
            integer_choice: None,
            nondet_id: None,
        }
    }

    /// Returns true if this step scheduled an actor.
    #[must_use]
    pub fn is_scheduling_choice(&self) -> bool {
        self.kind == ScheduleStepKind::SchedulingChoice
    }
}

/// Append-only list of decisions made in one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTrace {
    steps: Vec<ScheduleStep>,
}

impl ScheduleTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scheduling choice and returns its index.
    pub fn add_scheduling_choice(&mut self, actor: ActorId) -> usize {
        let index = self.steps.len();
        let mut step = ScheduleStep::empty(index, ScheduleStepKind::SchedulingChoice);
        step.scheduled_actor = Some(actor);
        self.steps.push(step);
        index
    }

    /// Records a boolean choice and returns its index.
    pub fn add_boolean_choice(&mut self, value: bool) -> usize {
        let index = self.steps.len();
        let mut step = ScheduleStep::empty(index, ScheduleStepKind::NondeterministicChoice);
        step.boolean_choice = Some(value);
        self.steps.push(step);
        index
    }

    /// Records a fair boolean choice made at choice point `nondet_id`.
    pub fn add_fair_boolean_choice(&mut self, nondet_id: &str, value: bool) -> usize {
        let index = self.steps.len();
        let mut step = ScheduleStep::empty(index, ScheduleStepKind::FairNondeterministicChoice);
        step.boolean_choice = Some(value);
        step.nondet_id = Some(nondet_id.to_owned());
        self.steps.push(step);
        index
    }

    /// Records an integer choice and returns its index.
    pub fn add_integer_choice(&mut self, value: u32) -> usize {
        let index = self.steps.len();
        let mut step = ScheduleStep::empty(index, ScheduleStepKind::NondeterministicChoice);
        step.integer_choice = Some(value);
        self.steps.push(step);
        index
    }

    /// Returns the most recent step.
    #[must_use]
    pub fn peek(&self) -> Option<&ScheduleStep> {
        self.steps.last()
    }

    /// Returns the step at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ScheduleStep> {
        self.steps.get(index)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no decision has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates over steps in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleStep> {
        self.steps.iter()
    }

    /// Steps from `start` to the end.
    #[must_use]
    pub fn tail(&self, start: usize) -> &[ScheduleStep] {
        self.steps.get(start..).unwrap_or(&[])
    }

    /// Removes every step.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Serializes the trace to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    /// Deserializes a trace from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the input is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }
}

impl Index<usize> for ScheduleTrace {
    type Output = ScheduleStep;

    fn index(&self, index: usize) -> &Self::Output {
        &self.steps[index]
    }
}

impl<'a> IntoIterator for &'a ScheduleTrace {
    type Item = &'a ScheduleStep;
    type IntoIter = std::slice::Iter<'a, ScheduleStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense() {
        let mut trace = ScheduleTrace::new();
        assert_eq!(trace.add_scheduling_choice(ActorId::new(1)), 0);
        assert_eq!(trace.add_boolean_choice(true), 1);
        assert_eq!(trace.add_fair_boolean_choice("retry", false), 2);
        assert_eq!(trace.add_integer_choice(4), 3);
        for (position, step) in trace.iter().enumerate() {
            assert_eq!(step.index, position);
        }
        assert_eq!(trace.peek().and_then(|s| s.integer_choice), Some(4));
    }

    #[test]
    fn fair_choice_keeps_id() {
        let mut trace = ScheduleTrace::new();
        trace.add_fair_boolean_choice("retry", true);
        let step = &trace[0];
        assert_eq!(step.kind, ScheduleStepKind::FairNondeterministicChoice);
        assert_eq!(step.nondet_id.as_deref(), Some("retry"));
        assert!(!step.is_scheduling_choice());
    }

    #[test]
    fn tail_past_end_is_empty() {
        let mut trace = ScheduleTrace::new();
        trace.add_scheduling_choice(ActorId::new(0));
        assert_eq!(trace.tail(0).len(), 1);
        assert!(trace.tail(5).is_empty());
    }

    #[test]
    fn json_round_trip_preserves_steps() {
        let mut trace = ScheduleTrace::new();
        trace.add_scheduling_choice(ActorId::new(3));
        trace.add_fair_boolean_choice("coin", true);
        let json = trace.to_json().expect("encode");
        assert_eq!(ScheduleTrace::from_json(&json).expect("decode"), trace);
    }
}
