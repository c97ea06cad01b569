//! Standalone snapshot of a recorded program model.
//!
//! A [`ProgramModelSummary`] outlives the iteration that recorded it: it
//! owns a compacted copy of the graph and is what bug reproduction replays.
//! Edges are arena indices, so the summary survives a JSON round trip with
//! its structure intact.

use super::graph::ProgramGraph;
use super::partial_order::count_tree_size;
use crate::error::Result;
use crate::types::StepId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Immutable snapshot of the causal graph of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramModelSummary {
    /// The compacted graph.
    pub graph: ProgramGraph,
    /// Root step of [`Self::graph`].
    pub root: StepId,
    /// The step that triggered the bug, if the execution found one.
    pub bug_step: Option<StepId>,
    /// Send steps that were dropped instead of delivered.
    pub withheld_sends: Vec<StepId>,
    /// Number of steps recorded, root included.
    pub step_count: usize,
    /// Whether the bug is a liveness violation.
    pub is_liveness_bug: bool,
    /// Name of the violated monitor, for liveness bugs.
    pub liveness_monitor: Option<String>,
}

impl ProgramModelSummary {
    /// Number of steps reachable from the root.
    #[must_use]
    pub fn tree_size(&self) -> usize {
        count_tree_size(&self.graph, self.root)
    }

    /// Returns true if `step` was a dropped send.
    #[must_use]
    pub fn is_withheld(&self, step: StepId) -> bool {
        self.withheld_sends.contains(&step)
    }

    /// Serializes the summary as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a summary from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the input is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the summary to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a summary written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
