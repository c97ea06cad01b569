//! Replay of a recorded program model.
//!
//! [`ProgramGraphReplayStrategy`] drives a fresh execution so that it
//! follows the causal order of a [`ProgramModelSummary`]. Unlike schedule
//! replay it does not care how the live run numbers its actors or messages,
//! nor in which order independent steps happen: any causally ready recorded
//! step with a matching live operation may run, and a [`TieBreak`] decides
//! among them.
//!
//! Once every recorded step has run, an optional suffix strategy takes over.
//! Without one the iteration ends.

use super::frontier::{ExactSignature, ReplayFrontier, StepMatcher};
use super::tie_break::{TieBreak, TotalOrderTieBreak};
use crate::error::{Error, ReplayError, Result};
use crate::liveness::monitor::LivenessViolation;
use crate::model::step::ProgramStepType;
use crate::model::summary::ProgramModelSummary;
use crate::schedule::bound_reached;
use crate::schedule::schedulable::Schedulable;
use crate::schedule::strategy::{ProgramState, SchedulingStrategy};
use crate::trace::ScheduleTrace;
use crate::tracing_compat::{debug, trace, warn};
use crate::types::ActorId;

/// Replays a recorded program graph.
pub struct ProgramGraphReplayStrategy<T: TieBreak = TotalOrderTieBreak> {
    summary: ProgramModelSummary,
    frontier: ReplayFrontier,
    matcher: Box<dyn StepMatcher>,
    tie_break: T,
    suffix: Option<Box<dyn SchedulingStrategy>>,
    use_suffix: bool,
    reached_end_hard: bool,
    scheduled_steps: usize,
    max_steps: usize,
    failure: Option<ReplayError>,
}

impl ProgramGraphReplayStrategy<TotalOrderTieBreak> {
    /// Replays `summary` in its recorded total order wherever order is free.
    #[must_use]
    pub fn new(summary: ProgramModelSummary, max_steps: usize) -> Self {
        Self::with_tie_break(summary, max_steps, TotalOrderTieBreak)
    }
}

impl<T: TieBreak> ProgramGraphReplayStrategy<T> {
    /// Monitor edges constrain replay order like inbox edges do.
    pub const MONITOR_COMMUNICATION_IS_PART_OF_PARTIAL_ORDER: bool = true;

    /// Replays `summary`, resolving free choices with `tie_break`.
    #[must_use]
    pub fn with_tie_break(summary: ProgramModelSummary, max_steps: usize, tie_break: T) -> Self {
        let frontier = Self::fresh_frontier(&summary);
        Self {
            summary,
            frontier,
            matcher: Box::new(ExactSignature),
            tie_break,
            suffix: None,
            use_suffix: false,
            reached_end_hard: false,
            scheduled_steps: 0,
            max_steps,
            failure: None,
        }
    }

    /// Replaces the step matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Box<dyn StepMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Continues with `suffix` once the recorded graph is exhausted.
    #[must_use]
    pub fn with_suffix(mut self, suffix: Box<dyn SchedulingStrategy>) -> Self {
        self.suffix = Some(suffix);
        self
    }

    fn fresh_frontier(summary: &ProgramModelSummary) -> ReplayFrontier {
        ReplayFrontier::new(
            &summary.graph,
            summary.root,
            Self::MONITOR_COMMUNICATION_IS_PART_OF_PARTIAL_ORDER,
        )
    }

    /// The summary being replayed.
    #[must_use]
    pub const fn summary(&self) -> &ProgramModelSummary {
        &self.summary
    }

    /// Replay progress.
    #[must_use]
    pub const fn frontier(&self) -> &ReplayFrontier {
        &self.frontier
    }

    /// Why replay stopped, if it could not follow the recording.
    #[must_use]
    pub fn failure(&self) -> Option<&ReplayError> {
        self.failure.as_ref()
    }

    /// Returns true once the suffix strategy has taken over.
    #[must_use]
    pub const fn is_using_suffix(&self) -> bool {
        self.use_suffix
    }

    fn fail(&mut self, error: ReplayError) {
        warn!(%error, steps = self.scheduled_steps, "graph replay diverged");
        self.failure = Some(error);
    }

    /// Switches to the suffix when the graph is exhausted. Returns true if
    /// the suffix is now in charge.
    fn switch_to_suffix_at_end(&mut self) -> bool {
        if !self.frontier.has_reached_end() {
            return false;
        }
        self.reached_end_hard = true;
        if self.suffix.is_some() {
            debug!(steps = self.scheduled_steps, "recorded graph exhausted, switching to suffix");
            self.use_suffix = true;
        }
        self.use_suffix
    }

    fn choice_fallback(&self) -> bool {
        ReplayFrontier::is_last_schedulable_step_of_actor(
            &self.summary.graph,
            self.frontier.current(),
        )
    }
}

impl<T: TieBreak> SchedulingStrategy for ProgramGraphReplayStrategy<T> {
    fn next_operation(&mut self, ops: &[Schedulable], current: ActorId) -> Option<ActorId> {
        if self.failure.is_some() {
            return None;
        }
        if self.use_suffix || self.switch_to_suffix_at_end() {
            let chosen = self.suffix.as_mut()?.next_operation(ops, current)?;
            self.scheduled_steps += 1;
            return Some(chosen);
        }
        if self.frontier.has_reached_end() {
            return None;
        }

        let candidates = self
            .frontier
            .candidates(&self.summary.graph, ops, self.matcher.as_ref());
        if candidates.is_empty() {
            self.fail(ReplayError::NoReadyStep {
                step: self.scheduled_steps,
            });
            return None;
        }
        let index = self.tie_break.choose(&candidates).min(candidates.len() - 1);
        let chosen = candidates[index];
        let live = ops.iter().find(|op| op.enabled && op.id == chosen.actor);
        self.frontier
            .record_choice(&self.summary.graph, chosen.step, live);
        self.scheduled_steps += 1;
        trace!(
            step = %chosen.step,
            actor = %chosen.actor,
            ready = candidates.len(),
            "replayed recorded step"
        );
        Some(chosen.actor)
    }

    fn next_boolean(&mut self, max_value: u32) -> Option<bool> {
        if self.failure.is_some() {
            return None;
        }
        if self.use_suffix {
            let value = self.suffix.as_mut()?.next_boolean(max_value)?;
            self.scheduled_steps += 1;
            return Some(value);
        }
        let graph = &self.summary.graph;
        let Some(step) = self.frontier.next_choice_step(graph, ProgramStepType::NonDetBool) else {
            if self.choice_fallback() {
                let value = self.scheduled_steps % 2 == 0;
                self.scheduled_steps += 1;
                return Some(value);
            }
            self.fail(ReplayError::MissingChoice(self.frontier.current()));
            return None;
        };
        let value = graph[step].boolean_choice.unwrap_or_default();
        self.frontier.record_choice(graph, step, None);
        self.scheduled_steps += 1;
        Some(value)
    }

    fn next_integer(&mut self, max_value: u32) -> Option<u32> {
        if self.failure.is_some() {
            return None;
        }
        if self.use_suffix {
            let value = self.suffix.as_mut()?.next_integer(max_value)?;
            self.scheduled_steps += 1;
            return Some(value);
        }
        let graph = &self.summary.graph;
        let Some(step) = self.frontier.next_choice_step(graph, ProgramStepType::NonDetInt) else {
            if self.choice_fallback() {
                self.scheduled_steps += 1;
                return Some(0);
            }
            self.fail(ReplayError::MissingChoice(self.frontier.current()));
            return None;
        };
        let value = graph[step].integer_choice.unwrap_or_default();
        if max_value > 0 && value >= max_value {
            self.fail(ReplayError::Unreproducible {
                step: self.scheduled_steps,
                reason: format!("recorded integer {value} is out of range 0..{max_value}"),
            });
            return None;
        }
        self.frontier.record_choice(graph, step, None);
        self.scheduled_steps += 1;
        Some(value)
    }

    fn force_next_operation(
        &mut self,
        _next: ActorId,
        _ops: &[Schedulable],
        _current: ActorId,
    ) -> Result<()> {
        Err(Error::unsupported("graph-replay", "force_next_operation"))
    }

    fn force_next_boolean(&mut self, _max_value: u32, _next: bool) -> Result<()> {
        Err(Error::unsupported("graph-replay", "force_next_boolean"))
    }

    fn force_next_integer(&mut self, _max_value: u32, _next: u32) -> Result<()> {
        Err(Error::unsupported("graph-replay", "force_next_integer"))
    }

    fn observe_state(
        &mut self,
        trace: &ScheduleTrace,
        state: &ProgramState,
    ) -> std::result::Result<(), LivenessViolation> {
        match self.suffix.as_mut() {
            Some(suffix) if self.use_suffix => suffix.observe_state(trace, state),
            _ => Ok(()),
        }
    }

    fn should_deliver(&mut self, send: &Schedulable) -> bool {
        if self.use_suffix {
            return self.suffix.as_mut().map_or(true, |s| s.should_deliver(send));
        }
        !self.summary.is_withheld(self.frontier.current())
    }

    fn on_send_dropped(&mut self, send: &Schedulable) {
        if self.use_suffix {
            if let Some(suffix) = self.suffix.as_mut() {
                suffix.on_send_dropped(send);
            }
            return;
        }
        let current = self.frontier.current();
        self.frontier
            .record_send_dropped(&self.summary.graph, current);
    }

    fn prepare_for_next_iteration(&mut self) -> bool {
        self.frontier = Self::fresh_frontier(&self.summary);
        self.scheduled_steps = 0;
        self.reached_end_hard = false;
        self.use_suffix = false;
        self.failure = None;
        self.suffix
            .as_mut()
            .map_or(true, |s| s.prepare_for_next_iteration())
    }

    fn reset(&mut self) {
        self.frontier = Self::fresh_frontier(&self.summary);
        self.scheduled_steps = 0;
        self.reached_end_hard = false;
        self.use_suffix = false;
        self.failure = None;
        if let Some(suffix) = self.suffix.as_mut() {
            suffix.reset();
        }
    }

    fn scheduled_steps(&self) -> usize {
        self.scheduled_steps
    }

    fn has_reached_max_scheduling_steps(&self) -> bool {
        let bounded = bound_reached(self.scheduled_steps, self.max_steps);
        if self.suffix.is_none() {
            self.reached_end_hard || bounded
        } else {
            bounded
        }
    }

    fn is_fair(&self) -> bool {
        self.use_suffix && self.suffix.as_ref().is_some_and(|s| s.is_fair())
    }

    fn description(&self) -> String {
        let base = format!("graph-replay[tie-break '{}']", self.tie_break.name());
        match &self.suffix {
            Some(suffix) => format!("{base} (suffix: {})", suffix.description()),
            None => base,
        }
    }
}

impl<T: TieBreak> std::fmt::Debug for ProgramGraphReplayStrategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramGraphReplayStrategy")
            .field("recorded_steps", &self.summary.step_count)
            .field("scheduled_steps", &self.scheduled_steps)
            .field("use_suffix", &self.use_suffix)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
