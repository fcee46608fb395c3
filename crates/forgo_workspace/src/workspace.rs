//! The workspace trait and its filesystem-backed implementations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::WorkspaceError;
use crate::mode::Mode;
use crate::stamp::{ResourceStamp, ResourceStatus};
use crate::writer::IncrementalFileWriter;

/// A file reported by [`Workspace::walk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    /// The visited file.
    pub path: PathBuf,
    /// Modification time, or the Unix epoch for removed files.
    pub modified: SystemTime,
    /// Length in bytes, or 0 for removed files.
    pub length: u64,
    /// Status as known to the walker. Authoritative only in [`Mode::Delta`];
    /// in other modes every present file is reported as [`ResourceStatus::New`]
    /// and the session computes the real status from its prior state.
    pub status: ResourceStatus,
}

impl WalkEntry {
    /// Returns the identity stamp of a present file, `None` for removed ones.
    pub fn stamp(&self) -> Option<ResourceStamp> {
        match self.status {
            ResourceStatus::Removed => None,
            _ => Some(ResourceStamp::File {
                length: self.length,
                modified: self.modified,
            }),
        }
    }
}

/// Presence, identity, and mutation primitives the build session relies on.
pub trait Workspace {
    /// The mode governing what [`walk`](Self::walk) reports.
    fn mode(&self) -> Mode {
        Mode::Normal
    }

    /// Returns `true` if the resource exists.
    fn is_present(&self, path: &Path) -> bool;

    /// Returns `true` if the resource is a regular file.
    fn is_regular_file(&self, path: &Path) -> bool;

    /// Returns `true` if the resource is a directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Returns the current identity stamp, or `None` if the resource is absent.
    fn stamp(&self, path: &Path) -> Option<ResourceStamp>;

    /// Computes the status of a resource against its recorded stamp.
    fn resource_status(&self, path: &Path, prior: &ResourceStamp) -> ResourceStatus {
        ResourceStatus::compare(Some(prior), self.stamp(path).as_ref())
    }

    /// Visits the regular files under `basedir` in a deterministic order.
    fn walk(
        &self,
        basedir: &Path,
        visitor: &mut dyn FnMut(&WalkEntry),
    ) -> Result<(), WorkspaceError>;

    /// Opens a write-if-different output stream for `path`.
    fn new_output_stream(&self, path: &Path) -> Result<IncrementalFileWriter, WorkspaceError> {
        Ok(IncrementalFileWriter::new(path))
    }

    /// Deletes a file. Deleting a file that is already gone is not an error.
    fn delete_file(&self, path: &Path) -> Result<(), WorkspaceError>;
}

/// Workspace backed directly by the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct FilesystemWorkspace {
    mode: Mode,
}

impl FilesystemWorkspace {
    /// Creates a workspace in [`Mode::Normal`].
    pub fn new() -> Self {
        Self { mode: Mode::Normal }
    }

    /// Creates a workspace reporting the given mode.
    ///
    /// [`Mode::Delta`] requires a change set; use [`DeltaWorkspace`] for it.
    pub fn with_mode(mode: Mode) -> Self {
        Self { mode }
    }
}

impl Workspace for FilesystemWorkspace {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn is_present(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn stamp(&self, path: &Path) -> Option<ResourceStamp> {
        std::fs::metadata(path)
            .ok()
            .map(|metadata| ResourceStamp::from_metadata(&metadata))
    }

    fn walk(
        &self,
        basedir: &Path,
        visitor: &mut dyn FnMut(&WalkEntry),
    ) -> Result<(), WorkspaceError> {
        if !basedir.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(basedir).sort_by_file_name() {
            let entry = entry.map_err(|e| WorkspaceError::Walk {
                path: basedir.to_path_buf(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry
                .metadata()
                .map_err(|e| WorkspaceError::Walk {
                    path: entry.path().to_path_buf(),
                    reason: e.to_string(),
                })?;
            visitor(&WalkEntry {
                path: entry.into_path(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                length: metadata.len(),
                status: ResourceStatus::New,
            });
        }
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<(), WorkspaceError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkspaceError::io(path, e)),
        }
    }
}

/// Workspace that reports only an externally supplied change set.
///
/// Integrations such as IDEs or file watchers already know which files
/// changed; walking with this workspace visits only those entries, and the
/// session treats every other previously known input as unchanged.
#[derive(Clone, Debug)]
pub struct DeltaWorkspace<W = FilesystemWorkspace> {
    inner: W,
    changes: BTreeMap<PathBuf, ResourceStatus>,
}

impl<W: Workspace> DeltaWorkspace<W> {
    /// Wraps `inner`, reporting `changes` from [`walk`](Workspace::walk).
    pub fn new(inner: W, changes: impl IntoIterator<Item = (PathBuf, ResourceStatus)>) -> Self {
        Self {
            inner,
            changes: changes.into_iter().collect(),
        }
    }
}

impl<W: Workspace> Workspace for DeltaWorkspace<W> {
    fn mode(&self) -> Mode {
        Mode::Delta
    }

    fn is_present(&self, path: &Path) -> bool {
        self.inner.is_present(path)
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        self.inner.is_regular_file(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.inner.is_directory(path)
    }

    fn stamp(&self, path: &Path) -> Option<ResourceStamp> {
        self.inner.stamp(path)
    }

    fn walk(
        &self,
        basedir: &Path,
        visitor: &mut dyn FnMut(&WalkEntry),
    ) -> Result<(), WorkspaceError> {
        for (path, status) in self.changes.range(basedir.to_path_buf()..) {
            if !path.starts_with(basedir) {
                break;
            }
            let entry = match (status, self.inner.stamp(path)) {
                (ResourceStatus::Removed, _) | (_, None) => WalkEntry {
                    path: path.clone(),
                    modified: SystemTime::UNIX_EPOCH,
                    length: 0,
                    status: ResourceStatus::Removed,
                },
                (status, Some(ResourceStamp::File { length, modified })) => WalkEntry {
                    path: path.clone(),
                    modified,
                    length,
                    status: *status,
                },
                (_, Some(ResourceStamp::Digest(_) | ResourceStamp::Absent)) => continue,
            };
            visitor(&entry);
        }
        Ok(())
    }

    fn new_output_stream(&self, path: &Path) -> Result<IncrementalFileWriter, WorkspaceError> {
        self.inner.new_output_stream(path)
    }

    fn delete_file(&self, path: &Path) -> Result<(), WorkspaceError> {
        self.inner.delete_file(path)
    }
}
