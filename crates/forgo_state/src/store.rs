//! Durable, atomically replaced storage of the build state.
//!
//! The state file is a 4-byte little-endian header length, a bincode header
//! (magic bytes, format version, payload checksum), and the bincode-encoded
//! [`BuildState`] payload.

use std::io::Write;
use std::path::{Path, PathBuf};

use forgo_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::state::BuildState;

/// Magic bytes identifying a forgo state file.
const STATE_MAGIC: [u8; 4] = *b"FRGO";

/// Current state format version. Increment on breaking changes to the
/// header or payload format.
const STATE_FORMAT_VERSION: u32 = 1;

/// Header prepended to every state file for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateHeader {
    /// Magic bytes: must be `b"FRGO"`.
    magic: [u8; 4],

    /// State format version.
    format_version: u32,

    /// Content hash of the payload data (for integrity checks).
    checksum: ContentHash,
}

/// A state file location bound to one build step.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store for the state file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the previous build's state.
    ///
    /// This is fail-safe: a missing, truncated, corrupt, or incompatible
    /// file yields an empty state, which makes every resource NEW.
    pub fn load(&self) -> BuildState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => BuildState::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable build state");
                BuildState::default()
            }
        }
    }

    /// Loads the previous build's state, reporting why it is unusable.
    ///
    /// Returns `Ok(None)` if no state file exists.
    pub fn try_load(&self) -> Result<Option<BuildState>, StateError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        decode_state(&self.path, &raw).map(Some)
    }

    /// Saves `state`, replacing the previous file atomically.
    ///
    /// The bytes go to a temporary file in the same directory which is then
    /// renamed over the target, so an interrupted save leaves either the old
    /// or the new state, never a partial one.
    pub fn save(&self, state: &BuildState) -> Result<(), StateError> {
        let bytes = encode_state(state)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| StateError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StateError::Io {
            path: dir.clone(),
            source: e,
        })?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StateError::Io {
                path: tmp.path().to_path_buf(),
                source: e,
            })?;
        tmp.persist(&self.path).map_err(|e| StateError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    /// Removes the state file, forcing the next session to start fresh.
    pub fn clear(&self) -> Result<(), StateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

fn encode_state(state: &BuildState) -> Result<Vec<u8>, StateError> {
    let payload = bincode::serde::encode_to_vec(state, bincode::config::standard()).map_err(|e| {
        StateError::Serialization {
            reason: e.to_string(),
        }
    })?;
    let header = StateHeader {
        magic: STATE_MAGIC,
        format_version: STATE_FORMAT_VERSION,
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| StateError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

fn decode_state(path: &Path, raw: &[u8]) -> Result<BuildState, StateError> {
    let invalid = |reason: &str| StateError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("file too short for header length"));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&raw[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (StateHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != STATE_MAGIC {
        return Err(invalid("bad magic bytes"));
    }
    if header.format_version != STATE_FORMAT_VERSION {
        return Err(StateError::VersionMismatch {
            path: path.to_path_buf(),
            expected: STATE_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(StateError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (state, _): (BuildState, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(|e| {
            StateError::Serialization {
                reason: e.to_string(),
            }
        })?;
    Ok(state)
}
