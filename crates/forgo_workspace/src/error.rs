//! Error types for workspace operations.

use std::path::PathBuf;

/// Errors that can occur while inspecting, walking, or writing workspace files.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// An I/O error occurred while accessing a workspace file.
    #[error("workspace I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A directory walk failed part-way.
    #[error("failed to walk {path}: {reason}")]
    Walk {
        /// The base directory being walked.
        path: PathBuf,
        /// Description of the walk failure.
        reason: String,
    },

    /// An archive could not be opened or one of its entries could not be read.
    #[error("invalid archive {path}: {reason}")]
    Archive {
        /// The archive file path.
        path: PathBuf,
        /// Description of the archive problem.
        reason: String,
    },
}

impl WorkspaceError {
    /// Creates an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = WorkspaceError::io(
            "/tmp/out/a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("workspace I/O error"));
        assert!(msg.contains("a.txt"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn archive_error_display() {
        let err = WorkspaceError::Archive {
            path: PathBuf::from("lib.jar"),
            reason: "invalid Zip archive".to_string(),
        };
        assert!(err.to_string().contains("invalid archive lib.jar"));
    }

    #[test]
    fn walk_error_display() {
        let err = WorkspaceError::Walk {
            path: PathBuf::from("src"),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "failed to walk src: permission denied");
    }
}
