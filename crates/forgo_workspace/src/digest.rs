//! Stable content digests for files, directory trees, and archives.
//!
//! Digests depend only on content and canonical entry order, never on
//! timestamps, so they detect content-level equality for dependency
//! fingerprints and non-filesystem resource stamps.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use forgo_common::{ContentHash, ContentHasher};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::WorkspaceError;
use crate::stamp::ResourceStamp;

/// File extensions treated as zip archives by [`digest_classpath`].
const ARCHIVE_EXTENSIONS: [&str; 2] = ["jar", "zip"];

/// Upper bound on the buffer reserved up front for an archive entry. The
/// declared entry size comes from the archive and is not trusted.
const ENTRY_RESERVE_LIMIT: u64 = 1 << 20;

/// Computes the digest of a single file's content.
pub fn digest_file(path: &Path) -> Result<ContentHash, WorkspaceError> {
    let content = std::fs::read(path).map_err(|e| WorkspaceError::io(path, e))?;
    Ok(ContentHash::from_bytes(&content))
}

/// Computes the digest of a directory tree.
///
/// Files are ordered by their `/`-separated path relative to `dir`; each
/// contributes its relative path and content digest. File contents are
/// hashed in parallel.
pub fn digest_directory(dir: &Path) -> Result<ContentHash, WorkspaceError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| WorkspaceError::Walk {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            let relative = relative_name(dir, entry.path());
            files.push((relative, entry.into_path()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let digests = files
        .par_iter()
        .map(|(_, path)| digest_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut hasher = ContentHasher::new();
    for ((relative, _), digest) in files.iter().zip(&digests) {
        hasher.update_str(relative);
        hasher.update_hash(digest);
    }
    Ok(hasher.finish())
}

/// Computes the digest of a zip archive's entries.
///
/// Entries are ordered by name; each contributes its name and, for files,
/// the digest of its uncompressed bytes. Compression settings and entry
/// timestamps do not affect the result.
pub fn digest_archive(path: &Path) -> Result<ContentHash, WorkspaceError> {
    let file = File::open(path).map_err(|e| WorkspaceError::io(path, e))?;
    let archive_error = |reason: String| WorkspaceError::Archive {
        path: path.to_path_buf(),
        reason,
    };
    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_error(e.to_string()))?;
        let name = entry.name().to_owned();
        let digest = if entry.is_dir() {
            None
        } else {
            let mut bytes = Vec::with_capacity(entry.size().min(ENTRY_RESERVE_LIMIT) as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| archive_error(format!("{name}: {e}")))?;
            Some(ContentHash::from_bytes(&bytes))
        };
        entries.push((name, digest));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = ContentHasher::new();
    for (name, digest) in &entries {
        hasher.update_str(name);
        if let Some(digest) = digest {
            hasher.update_hash(digest);
        }
    }
    Ok(hasher.finish())
}

/// Computes one fingerprint for an ordered list of classpath entries.
///
/// Directories are digested as trees, archives through `cache`, and other
/// files by content. Missing entries contribute a fixed marker, so an entry
/// appearing or disappearing changes the fingerprint.
pub fn digest_classpath(
    entries: &[PathBuf],
    cache: &mut ArchiveDigestCache,
) -> Result<ContentHash, WorkspaceError> {
    let mut hasher = ContentHasher::new();
    for entry in entries {
        hasher.update_str(&entry.to_string_lossy());
        if entry.is_dir() {
            hasher.update_hash(&digest_directory(entry)?);
        } else if entry.is_file() {
            let digest = if is_archive(entry) {
                cache.digest(entry)?
            } else {
                digest_file(entry)?
            };
            hasher.update_hash(&digest);
        } else {
            hasher.update_str("<missing>");
        }
    }
    Ok(hasher.finish())
}

/// Cache of archive digests keyed by path, length, and modification time.
///
/// Archives on a dependency classpath rarely change between builds, and
/// re-reading every entry is expensive. The cache is an explicit value owned
/// by the caller (typically the orchestrator), never a process global.
#[derive(Debug, Default)]
pub struct ArchiveDigestCache {
    entries: HashMap<PathBuf, (ResourceStamp, ContentHash)>,
    hits: usize,
}

impl ArchiveDigestCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the archive digest, recomputing it only when the archive's
    /// length or modification time changed since it was cached.
    pub fn digest(&mut self, path: &Path) -> Result<ContentHash, WorkspaceError> {
        let metadata = std::fs::metadata(path).map_err(|e| WorkspaceError::io(path, e))?;
        let stamp = ResourceStamp::from_metadata(&metadata);
        if let Some((cached_stamp, digest)) = self.entries.get(path) {
            if *cached_stamp == stamp {
                self.hits += 1;
                return Ok(*digest);
            }
        }
        let digest = digest_archive(path)?;
        self.entries.insert(path.to_path_buf(), (stamp, digest));
        Ok(digest)
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of cached archives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached digest.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ARCHIVE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn relative_name(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])], method: zip::CompressionMethod) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(method);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn file_digest_follows_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();
        assert_eq!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
        fs::write(&b, "different").unwrap();
        assert_ne!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn file_digest_missing_errors() {
        assert!(digest_file(Path::new("/nonexistent/file.txt")).is_err());
    }

    #[test]
    fn directory_digest_ignores_location() {
        let dir = tempfile::tempdir().unwrap();
        for root in ["one", "two"] {
            let base = dir.path().join(root);
            fs::create_dir_all(base.join("sub")).unwrap();
            fs::write(base.join("a.txt"), "a").unwrap();
            fs::write(base.join("sub/b.txt"), "b").unwrap();
        }
        assert_eq!(
            digest_directory(&dir.path().join("one")).unwrap(),
            digest_directory(&dir.path().join("two")).unwrap()
        );
    }

    #[test]
    fn directory_digest_sees_renames_and_edits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let before = digest_directory(dir.path()).unwrap();

        fs::rename(dir.path().join("a.txt"), dir.path().join("c.txt")).unwrap();
        let renamed = digest_directory(dir.path()).unwrap();
        assert_ne!(before, renamed);

        fs::write(dir.path().join("c.txt"), "changed").unwrap();
        assert_ne!(renamed, digest_directory(dir.path()).unwrap());
    }

    #[test]
    fn archive_digest_ignores_order_and_compression() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jar");
        let b = dir.path().join("b.jar");
        write_zip(
            &a,
            &[("x/A.class", b"aaa"), ("x/B.class", b"bbb")],
            zip::CompressionMethod::Stored,
        );
        write_zip(
            &b,
            &[("x/B.class", b"bbb"), ("x/A.class", b"aaa")],
            zip::CompressionMethod::Deflated,
        );
        assert_eq!(digest_archive(&a).unwrap(), digest_archive(&b).unwrap());
    }

    #[test]
    fn archive_digest_sees_entry_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.zip");
        let b = dir.path().join("b.zip");
        write_zip(&a, &[("A", b"one")], zip::CompressionMethod::Stored);
        write_zip(&b, &[("A", b"two")], zip::CompressionMethod::Stored);
        assert_ne!(digest_archive(&a).unwrap(), digest_archive(&b).unwrap());
    }

    #[test]
    fn archive_digest_does_not_trust_declared_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.jar");
        write_zip(&path, &[("a.class", b"payload")], zip::CompressionMethod::Stored);

        // Claim an enormous uncompressed size in the central directory.
        let mut bytes = fs::read(&path).unwrap();
        let central = bytes
            .windows(4)
            .position(|window| window == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        // Either outcome is acceptable; the call must not abort.
        let _ = digest_archive(&path);
    }

    #[test]
    fn archive_digest_rejects_non_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jar");
        fs::write(&path, "not a zip").unwrap();
        assert!(matches!(
            digest_archive(&path),
            Err(WorkspaceError::Archive { .. })
        ));
    }

    #[test]
    fn cache_reuses_digest_until_archive_changes() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_zip(&jar, &[("A", b"one")], zip::CompressionMethod::Stored);

        let mut cache = ArchiveDigestCache::new();
        let first = cache.digest(&jar).unwrap();
        let second = cache.digest(&jar).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);

        write_zip(&jar, &[("A", b"one"), ("B", b"two")], zip::CompressionMethod::Stored);
        let third = cache.digest(&jar).unwrap();
        assert_ne!(first, third);
        assert_eq!(cache.hits(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn classpath_fingerprint_tracks_entries() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes");
        fs::create_dir_all(&classes).unwrap();
        fs::write(classes.join("A.class"), "a").unwrap();
        let jar = dir.path().join("dep.jar");
        write_zip(&jar, &[("B.class", b"b")], zip::CompressionMethod::Stored);
        let missing = dir.path().join("missing.jar");

        let mut cache = ArchiveDigestCache::new();
        let entries = vec![classes.clone(), jar.clone(), missing.clone()];
        let before = digest_classpath(&entries, &mut cache).unwrap();
        assert_eq!(before, digest_classpath(&entries, &mut cache).unwrap());

        write_zip(&missing, &[("C.class", b"c")], zip::CompressionMethod::Stored);
        assert_ne!(before, digest_classpath(&entries, &mut cache).unwrap());
    }
}
