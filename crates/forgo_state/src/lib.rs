//! Persisted build state for incremental build sessions.
//!
//! A [`BuildState`] is the complete memory one build session leaves for the
//! next: the resource identity table, per-input attributes and associations,
//! per-output capabilities, and per-resource messages. [`StateStore`] loads it
//! fail-safe (anything unreadable becomes an empty state, forcing a full
//! rebuild) and saves it atomically.

#![warn(missing_docs)]

pub mod error;
pub mod resource;
pub mod state;
pub mod store;

pub use error::StateError;
pub use resource::{ResourceId, ResourceTable};
pub use state::{BuildState, InputRecord, OutputRecord};
pub use store::StateStore;
