//! Shared foundational types used across the forgo build-avoidance engine.
//!
//! This crate provides content hashing for change detection and digests, and
//! the qualified names used by the requirement/capability index.

#![warn(missing_docs)]

pub mod hash;
pub mod name;

pub use hash::{ContentHash, ContentHasher};
pub use name::QualifiedName;
