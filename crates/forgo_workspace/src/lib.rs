//! The workspace collaborator consumed by the build-avoidance core.
//!
//! A [`Workspace`] answers presence and identity questions about resources,
//! walks directories, writes outputs with write-if-different semantics, and
//! deletes stale files. [`FilesystemWorkspace`] is the default implementation
//! backed by the local filesystem; [`DeltaWorkspace`] layers an externally
//! supplied change set on top of it for integrations that already know which
//! files changed. The [`digest`] module computes stable content digests for
//! files, directory trees, and archives.

#![warn(missing_docs)]

pub mod digest;
pub mod error;
pub mod mode;
pub mod stamp;
pub mod workspace;
pub mod writer;

pub use digest::{digest_archive, digest_classpath, digest_directory, digest_file, ArchiveDigestCache};
pub use error::WorkspaceError;
pub use mode::Mode;
pub use stamp::{ResourceStamp, ResourceStatus};
pub use workspace::{DeltaWorkspace, FilesystemWorkspace, WalkEntry, Workspace};
pub use writer::IncrementalFileWriter;
