//! Identity stamps and the resource status derived from comparing them.

use forgo_common::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::Metadata;
use std::time::SystemTime;

/// The identity of a resource's content at a point in time.
///
/// Stamps are only ever compared for equality to detect change; they are
/// never used as structural keys.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ResourceStamp {
    /// A filesystem resource identified by length and modification time.
    File {
        /// File length in bytes.
        length: u64,
        /// Last modification time.
        modified: SystemTime,
    },
    /// A non-filesystem resource (classpath entry, URL) identified by a
    /// digest of its content.
    Digest(ContentHash),
    /// A resource that was looked up but did not exist, such as an include
    /// not found on a search path.
    Absent,
}

impl ResourceStamp {
    /// Builds a file stamp from filesystem metadata.
    ///
    /// Platforms that cannot report a modification time fall back to the
    /// Unix epoch, so change detection degrades to length comparison.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self::File {
            length: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// Returns `true` for [`Absent`](Self::Absent).
    pub fn is_absent(&self) -> bool {
        matches!(self, ResourceStamp::Absent)
    }
}

/// The status of a resource relative to the previous build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ResourceStatus {
    /// No record of the resource exists in the previous build.
    New,
    /// The resource exists and its stamp differs from the recorded one.
    Modified,
    /// The resource exists and its stamp matches the recorded one.
    Unmodified,
    /// The resource no longer exists.
    Removed,
}

impl ResourceStatus {
    /// Derives a status from the recorded and current stamps.
    ///
    /// `current` is `None` (or [`ResourceStamp::Absent`]) when the resource
    /// is not present. A resource recorded as absent that is still absent is
    /// unmodified; one that has since appeared is new.
    pub fn compare(prior: Option<&ResourceStamp>, current: Option<&ResourceStamp>) -> Self {
        let was_absent = prior.is_some_and(ResourceStamp::is_absent);
        let prior = prior.filter(|stamp| !stamp.is_absent());
        let current = current.filter(|stamp| !stamp.is_absent());
        match (prior, current) {
            (None, None) if was_absent => ResourceStatus::Unmodified,
            (_, None) => ResourceStatus::Removed,
            (None, Some(_)) => ResourceStatus::New,
            (Some(prior), Some(current)) if prior == current => ResourceStatus::Unmodified,
            (Some(_), Some(_)) => ResourceStatus::Modified,
        }
    }

    /// Returns `true` for [`New`](Self::New) and [`Modified`](Self::Modified).
    pub fn is_changed(self) -> bool {
        matches!(self, ResourceStatus::New | ResourceStatus::Modified)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceStatus::New => write!(f, "new"),
            ResourceStatus::Modified => write!(f, "modified"),
            ResourceStatus::Unmodified => write!(f, "unmodified"),
            ResourceStatus::Removed => write!(f, "removed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn file(length: u64, secs: u64) -> ResourceStamp {
        ResourceStamp::File {
            length,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    #[test]
    fn compare_absent() {
        let absent = ResourceStamp::Absent;
        assert_eq!(
            ResourceStatus::compare(Some(&absent), None),
            ResourceStatus::Unmodified
        );
        assert_eq!(
            ResourceStatus::compare(Some(&absent), Some(&absent)),
            ResourceStatus::Unmodified
        );
        assert_eq!(
            ResourceStatus::compare(Some(&absent), Some(&file(1, 1))),
            ResourceStatus::New
        );
        assert_eq!(
            ResourceStatus::compare(Some(&file(1, 1)), Some(&absent)),
            ResourceStatus::Removed
        );
    }

    #[test]
    fn compare_new() {
        assert_eq!(
            ResourceStatus::compare(None, Some(&file(1, 1))),
            ResourceStatus::New
        );
    }

    #[test]
    fn compare_unmodified() {
        assert_eq!(
            ResourceStatus::compare(Some(&file(1, 1)), Some(&file(1, 1))),
            ResourceStatus::Unmodified
        );
    }

    #[test]
    fn compare_modified_length_or_time() {
        assert_eq!(
            ResourceStatus::compare(Some(&file(1, 1)), Some(&file(2, 1))),
            ResourceStatus::Modified
        );
        assert_eq!(
            ResourceStatus::compare(Some(&file(1, 1)), Some(&file(1, 2))),
            ResourceStatus::Modified
        );
    }

    #[test]
    fn compare_removed() {
        assert_eq!(
            ResourceStatus::compare(Some(&file(1, 1)), None),
            ResourceStatus::Removed
        );
    }

    #[test]
    fn digest_stamps() {
        let a = ResourceStamp::Digest(ContentHash::from_bytes(b"a"));
        let b = ResourceStamp::Digest(ContentHash::from_bytes(b"b"));
        assert_eq!(
            ResourceStatus::compare(Some(&a), Some(&a)),
            ResourceStatus::Unmodified
        );
        assert_eq!(
            ResourceStatus::compare(Some(&a), Some(&b)),
            ResourceStatus::Modified
        );
        assert_eq!(
            ResourceStatus::compare(Some(&a), Some(&file(1, 1))),
            ResourceStatus::Modified
        );
    }

    #[test]
    fn is_changed() {
        assert!(ResourceStatus::New.is_changed());
        assert!(ResourceStatus::Modified.is_changed());
        assert!(!ResourceStatus::Unmodified.is_changed());
        assert!(!ResourceStatus::Removed.is_changed());
    }
}
