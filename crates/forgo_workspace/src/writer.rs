//! Write-if-different output streams.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;

/// Buffers an output's bytes and touches the file only if they changed.
///
/// Rewriting an output with identical bytes leaves its modification time
/// alone, so consumers keyed on the output's identity stamp are not
/// invalidated. Call [`finish`](Self::finish) to flush and observe errors;
/// dropping an unfinished writer flushes on a best-effort basis.
#[derive(Debug)]
pub struct IncrementalFileWriter {
    path: PathBuf,
    buffer: Vec<u8>,
    finished: bool,
}

impl IncrementalFileWriter {
    /// Creates a writer for `path`. Nothing is written until finished.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// The path this writer targets.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the buffered bytes to disk if they differ from the file's
    /// current content. Returns `true` if the file was (re)written.
    pub fn finish(mut self) -> Result<bool, WorkspaceError> {
        self.finished = true;
        self.flush_to_disk()
    }

    fn flush_to_disk(&self) -> Result<bool, WorkspaceError> {
        match std::fs::read(&self.path) {
            Ok(existing) if existing == self.buffer => return Ok(false),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(WorkspaceError::io(&self.path, e)),
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        }
        std::fs::write(&self.path, &self.buffer).map_err(|e| WorkspaceError::io(&self.path, e))?;
        Ok(true)
    }
}

impl Write for IncrementalFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for IncrementalFileWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.flush_to_disk() {
            tracing::warn!(path = %self.path.display(), error = %e, "dropped output writer failed to flush");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_new_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/a.txt");
        let mut w = IncrementalFileWriter::new(&path);
        w.write_all(b"hello").unwrap();
        assert!(w.finish().unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn identical_bytes_keep_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "same").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let mut w = IncrementalFileWriter::new(&path);
        w.write_all(b"same").unwrap();
        assert!(!w.finish().unwrap());

        let after = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn different_bytes_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old").unwrap();
        let mut w = IncrementalFileWriter::new(&path);
        w.write_all(b"new content").unwrap();
        assert!(w.finish().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new content");
    }

    #[test]
    fn drop_flushes_unfinished_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        {
            let mut w = IncrementalFileWriter::new(&path);
            write!(w, "dropped {}", 1).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "dropped 1");
    }
}
