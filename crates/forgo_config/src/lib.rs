//! Parsing and validation of `forgo.toml` build step configuration files.
//!
//! A step configuration names the state file a build step persists to, the
//! workspace [`Mode`](forgo_workspace::Mode) it runs in, and the parameters
//! whose [`ConfigurationDigest`] decides whether a session must escalate to a
//! full rebuild.

#![warn(missing_docs)]

pub mod digest;
pub mod error;
pub mod loader;
pub mod types;

pub use digest::ConfigurationDigest;
pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
