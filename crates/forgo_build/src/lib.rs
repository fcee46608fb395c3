//! Incremental build sessions.
//!
//! A [`BuildContext`] is opened against the state file of one build step. It
//! reconstructs the previous build's input/output graph, answers which inputs
//! require processing, records what the current build produces, and at
//! [`commit`](BuildContext::commit) deletes outputs no longer backed by any
//! input, replays carried-over messages, and persists the new state.
//!
//! Inputs depend on outputs through requirements and capabilities: when a
//! processed output starts or stops providing a capability, every input that
//! requires it is processed again ([`BuildContext::process_with_dependents`]).
//! [`AggregateOutput`] covers outputs generated from many inputs at once.

#![warn(missing_docs)]

pub mod aggregate;
pub mod collector;
pub mod commit;
pub mod context;
pub mod error;
pub mod graph;
pub mod invalidation;
pub mod summary;

pub use aggregate::AggregateOutput;
pub use context::BuildContext;
pub use error::BuildError;
pub use graph::{Input, OldOutput, Output};
pub use summary::BuildSummary;
