//! Arena-backed program graph.
//!
//! Steps live in a `Vec` and refer to each other by [`StepId`]. Linking
//! always writes both directions of an edge, so the back pointers are never
//! stale.

use super::step::ProgramStep;
use crate::types::{MonitorId, StepId};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Owns every step of a recorded or cloned program model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramGraph {
    steps: Vec<ProgramStep>,
}

impl ProgramGraph {
    /// Creates an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step and returns its id.
    pub fn add(&mut self, step: ProgramStep) -> StepId {
        let id = StepId::from_index(self.steps.len());
        self.steps.push(step);
        id
    }

    /// Looks up a step.
    #[must_use]
    pub fn get(&self, id: StepId) -> Option<&ProgramStep> {
        self.steps.get(id.index())
    }

    /// Number of steps in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the arena holds no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates over every step with its id.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &ProgramStep)> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| (StepId::from_index(index), step))
    }

    /// Makes `child` the next step of `parent`'s actor.
    pub fn link_machine(&mut self, parent: StepId, child: StepId) {
        self[parent].edges.next_machine = Some(child);
        self[child].edges.prev_machine = Some(parent);
    }

    /// Makes `child` the step caused by `parent`.
    pub fn link_created(&mut self, parent: StepId, child: StepId) {
        self[parent].edges.created = Some(child);
        self[child].edges.creator = Some(parent);
    }

    /// Orders `child` right after `parent` in an inbox.
    pub fn link_enqueued(&mut self, parent: StepId, child: StepId) {
        self[parent].edges.next_enqueued = Some(child);
        self[child].edges.prev_enqueued = Some(parent);
    }

    /// Orders `child` right after `parent` in `monitor`'s event order.
    pub fn link_monitor(&mut self, monitor: MonitorId, parent: StepId, child: StepId) {
        self[parent].edges.next_monitor.insert(monitor, child);
        self[child].edges.prev_monitor.insert(monitor, parent);
    }

    /// Number of `prev_enqueued` hops from `id` to the head of its inbox chain.
    #[must_use]
    pub fn inbox_depth(&self, id: StepId) -> usize {
        let mut depth = 0;
        let mut at = self[id].edges.prev_enqueued;
        while let Some(prev) = at {
            depth += 1;
            at = self[prev].edges.prev_enqueued;
        }
        depth
    }
}

impl Index<StepId> for ProgramGraph {
    type Output = ProgramStep;

    fn index(&self, id: StepId) -> &Self::Output {
        &self.steps[id.index()]
    }
}

impl IndexMut<StepId> for ProgramGraph {
    fn index_mut(&mut self, id: StepId) -> &mut Self::Output {
        &mut self.steps[id.index()]
    }
}
