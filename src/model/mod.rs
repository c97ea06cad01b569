//! Causal program model.
//!
//! While an execution runs, a [`ProgramModel`] records every decision as a
//! [`ProgramStep`] in an arena-backed [`ProgramGraph`]. The graph captures
//! causality rather than the concrete interleaving: which actor step
//! followed which, which send caused which receive, and the order of
//! deliveries into each inbox. When a bug is found the graph is compacted
//! into a [`ProgramModelSummary`] that later runs can replay.

pub mod graph;
pub mod partial_order;
pub mod recorder;
pub mod step;
pub mod summary;

pub use graph::ProgramGraph;
pub use partial_order::{
    clone_partial_order, count_tree_size, slice_subtree, steps_in_subtree, steps_match,
    ClonedPartialOrder,
};
pub use recorder::ProgramModel;
pub use step::{ProgramStep, ProgramStepType, StepEdges};
pub use summary::ProgramModelSummary;
