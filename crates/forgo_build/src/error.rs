//! Error types for build session operations.

use std::path::PathBuf;

use forgo_state::StateError;
use forgo_workspace::WorkspaceError;

/// Errors that can occur during a build session.
///
/// Diagnostics produced by the tools driving the session are not errors;
/// they are recorded as messages and decide the build outcome at commit.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A registered input does not exist or is not a regular file.
    #[error("invalid input {path}: not an existing regular file")]
    InvalidInput {
        /// The rejected input path.
        path: PathBuf,
    },

    /// A registered output cannot be written.
    #[error("invalid output {path}: {reason}")]
    InvalidOutput {
        /// The rejected output path.
        path: PathBuf,
        /// Why the output was rejected.
        reason: String,
    },

    /// An operation was attempted that the session state does not allow.
    #[error("illegal session state: {0}")]
    IllegalState(String),

    /// An input attribute could not be encoded or decoded.
    #[error("attribute '{key}': {reason}")]
    Attribute {
        /// The attribute key.
        key: String,
        /// Description of the encoding failure.
        reason: String,
    },

    /// A resource path could not be made absolute.
    #[error("cannot resolve path {path}: {source}")]
    Path {
        /// The path that failed to resolve.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Saving the build state failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A workspace operation failed.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
