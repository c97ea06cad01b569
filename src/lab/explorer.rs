//! Testing and reproduction engines.
//!
//! [`TestingEngine`] runs a [`Program`] for many iterations under one
//! scheduling strategy and stops at the first bug, returning its schedule
//! trace and causal summary. [`reproduce`] replays such a summary with
//! [`ProgramGraphReplayStrategy`] and checks, run by run, that the same bug
//! step is reached again.

use super::actor::ActorContext;
use super::config::ExplorationConfig;
use super::runtime::{execute, BugKind, ExecutionReport};
use crate::error::{Error, ReplayError, Result};
use crate::liveness::monitor::Monitor;
use crate::model::partial_order::steps_match;
use crate::model::summary::ProgramModelSummary;
use crate::replay::{ProgramGraphReplayStrategy, TieBreak};
use crate::schedule::strategy::SchedulingStrategy;
use crate::trace::ScheduleTrace;
use crate::tracing_compat::{debug, info, info_span, warn};
use crate::types::StepId;

/// A program under test.
pub trait Program {
    /// Creates the initial actors and sends the initial events.
    ///
    /// Runs as the harness's root step at the start of every iteration.
    fn setup(&self, cx: &mut ActorContext<'_>);

    /// Fresh specification monitors for one iteration.
    fn monitors(&self) -> Vec<Box<dyn Monitor>> {
        Vec::new()
    }

    /// Program name for logs.
    fn name(&self) -> &str {
        "program"
    }
}

/// A bug found during exploration.
#[derive(Debug, Clone)]
pub struct FoundBug {
    /// Zero-based iteration that found the bug.
    pub iteration: usize,
    /// What went wrong.
    pub kind: BugKind,
    /// Every decision of the buggy iteration.
    pub trace: ScheduleTrace,
    /// Causal summary for reproduction.
    pub summary: ProgramModelSummary,
}

/// Result of a testing run.
#[derive(Debug, Clone)]
pub struct TestReport {
    /// Iterations executed.
    pub iterations: usize,
    /// Decisions made across all iterations.
    pub total_steps: usize,
    /// The first bug found, if any.
    pub bug: Option<FoundBug>,
    /// Description of the strategy used.
    pub strategy: String,
}

impl TestReport {
    /// Returns true if a bug was found.
    #[must_use]
    pub const fn found_bug(&self) -> bool {
        self.bug.is_some()
    }
}

/// Explores a program's schedules for bugs.
#[derive(Debug, Clone)]
pub struct TestingEngine {
    config: ExplorationConfig,
}

impl TestingEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub const fn new(config: ExplorationConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Explores `program` with the strategy described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an invalid configuration, or any
    /// error raised while executing an iteration.
    pub fn run(&self, program: &dyn Program) -> Result<TestReport> {
        self.config.validate()?;
        let mut strategy = self.config.build_strategy();
        self.run_with(program, strategy.as_mut())
    }

    /// Explores `program` with a caller-provided strategy.
    ///
    /// Runs up to the configured number of iterations, stopping early at the
    /// first bug or when the strategy has nothing left to explore.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnabled`] if the strategy picks a disabled actor.
    pub fn run_with(
        &self,
        program: &dyn Program,
        strategy: &mut dyn SchedulingStrategy,
    ) -> Result<TestReport> {
        let _span = info_span!("testing", program = program.name()).entered();
        let mut report = TestReport {
            iterations: 0,
            total_steps: 0,
            bug: None,
            strategy: strategy.description(),
        };

        for iteration in 0..self.config.iterations {
            if iteration > 0 && !strategy.prepare_for_next_iteration() {
                debug!(iteration, "strategy has no further iterations");
                break;
            }
            let execution = execute(program, strategy, self.config.connect_successive_handlers)?;
            report.iterations += 1;
            report.total_steps += execution.steps();

            if let Some(kind) = execution.bug.clone() {
                info!(iteration, steps = execution.steps(), bug = %kind, "bug found");
                report.bug = Some(FoundBug {
                    iteration,
                    kind,
                    summary: execution.model.summary(),
                    trace: execution.trace,
                });
                break;
            }
        }

        info!(
            iterations = report.iterations,
            total_steps = report.total_steps,
            found_bug = report.found_bug(),
            "testing finished"
        );
        Ok(report)
    }
}

/// Outcome of one reproduction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The run reached a step matching the recorded bug step and failed
    /// the same way.
    Reproduced,
    /// The run followed the recorded order but the bug did not show.
    NotReproduced,
    /// The run could not follow the recorded order.
    ReplayFailed(ReplayError),
}

/// Results of all reproduction runs of one summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reproduction {
    /// One outcome per run, in order.
    pub runs: Vec<ReplayOutcome>,
}

impl Reproduction {
    /// Number of runs that reproduced the bug.
    #[must_use]
    pub fn reproduced_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|run| matches!(run, ReplayOutcome::Reproduced))
            .count()
    }

    /// Returns true if every run reproduced the bug.
    #[must_use]
    pub fn is_reliable(&self) -> bool {
        !self.runs.is_empty() && self.reproduced_count() == self.runs.len()
    }

    /// The first replay failure, if any run could not follow the model.
    #[must_use]
    pub fn first_failure(&self) -> Option<&ReplayError> {
        self.runs.iter().find_map(|run| match run {
            ReplayOutcome::ReplayFailed(err) => Some(err),
            _ => None,
        })
    }

    /// Aggregate outcome.
    ///
    /// `Reproduced` if any run reproduced the bug, else `NotReproduced` if
    /// any run followed the model faithfully, else the first failure.
    #[must_use]
    pub fn outcome(&self) -> ReplayOutcome {
        if self.reproduced_count() > 0 {
            return ReplayOutcome::Reproduced;
        }
        if self
            .runs
            .iter()
            .any(|run| matches!(run, ReplayOutcome::NotReproduced))
        {
            return ReplayOutcome::NotReproduced;
        }
        self.first_failure().map_or(ReplayOutcome::NotReproduced, |err| {
            ReplayOutcome::ReplayFailed(err.clone())
        })
    }
}

/// Replays `summary` against `program` `config.reproduction_runs` times.
///
/// Each run follows the recorded causal order with `tie_break` choosing
/// among concurrently ready steps. A run reproduces the bug when it fails
/// the same way at a step whose causal path matches the recorded bug step.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the summary records no bug, or any
/// error raised while executing a run.
pub fn reproduce<T: TieBreak>(
    summary: &ProgramModelSummary,
    program: &dyn Program,
    config: &ExplorationConfig,
    tie_break: T,
) -> Result<Reproduction> {
    let Some(bug_step) = summary.bug_step else {
        return Err(Error::InvalidConfig(
            "summary does not record a bug step".to_owned(),
        ));
    };
    let _span = info_span!("reproduce", program = program.name(), bug_step = %bug_step).entered();
    let mut strategy =
        ProgramGraphReplayStrategy::with_tie_break(summary.clone(), config.max_fair_steps, tie_break);

    let mut runs = Vec::with_capacity(config.reproduction_runs);
    for run in 0..config.reproduction_runs {
        if run > 0 {
            strategy.prepare_for_next_iteration();
        }
        let execution = execute(program, &mut strategy, config.connect_successive_handlers)?;
        let outcome = match strategy.failure() {
            Some(err) => ReplayOutcome::ReplayFailed(err.clone()),
            None if reproduces(summary, bug_step, &execution) => ReplayOutcome::Reproduced,
            None => ReplayOutcome::NotReproduced,
        };
        if outcome != ReplayOutcome::Reproduced {
            warn!(run, ?outcome, "reproduction run missed the bug");
        }
        runs.push(outcome);
    }

    let reproduction = Reproduction { runs };
    info!(
        runs = reproduction.runs.len(),
        reproduced = reproduction.reproduced_count(),
        "reproduction finished"
    );
    Ok(reproduction)
}

fn reproduces(summary: &ProgramModelSummary, bug_step: StepId, execution: &ExecutionReport) -> bool {
    if summary.is_liveness_bug {
        let Some(name) = summary.liveness_monitor.as_deref() else {
            return false;
        };
        let Some(monitor) = execution
            .monitors
            .iter()
            .find(|m| m.name == name && m.status.is_hot())
        else {
            return false;
        };
        return execution
            .model
            .hot_entry(monitor.id)
            .is_some_and(|hot| steps_match(&summary.graph, bug_step, execution.model.graph(), hot));
    }
    matches!(execution.bug, Some(BugKind::Assertion { .. }))
        && execution
            .model
            .bug_step()
            .is_some_and(|step| steps_match(&summary.graph, bug_step, execution.model.graph(), step))
}
