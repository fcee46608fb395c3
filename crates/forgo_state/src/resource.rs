//! Resource identifiers and the table interning resource paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Opaque identifier for a resource path in a [`ResourceTable`].
///
/// Inputs, outputs, and messages refer to each other through these ids
/// rather than through object references, which keeps the graph acyclic in
/// memory and trivially serializable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ResourceId(u32);

impl ResourceId {
    /// Creates a `ResourceId` from a raw `u32` value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` value of this `ResourceId`.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Append-only interner mapping resource paths to [`ResourceId`]s.
///
/// Ids handed out by a table stay valid for that table's lifetime. A session
/// starts from the previous build's table so that ids recorded in the prior
/// state keep resolving; commit builds a fresh, compacted table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PathBuf>", into = "Vec<PathBuf>")]
pub struct ResourceTable {
    paths: Vec<PathBuf>,
    index: HashMap<PathBuf, ResourceId>,
}

impl ResourceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `path`, interning it if needed.
    pub fn intern(&mut self, path: &Path) -> ResourceId {
        if let Some(id) = self.index.get(path) {
            return *id;
        }
        let id = ResourceId(self.paths.len() as u32);
        self.paths.push(path.to_path_buf());
        self.index.insert(path.to_path_buf(), id);
        id
    }

    /// Returns the id for `path` if it has been interned.
    pub fn get(&self, path: &Path) -> Option<ResourceId> {
        self.index.get(path).copied()
    }

    /// Resolves an id back to its path.
    ///
    /// # Panics
    ///
    /// Panics if the id was not created by this table.
    pub fn path(&self, id: ResourceId) -> &Path {
        &self.paths[id.0 as usize]
    }

    /// Number of interned paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterates over ids and paths in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Path)> {
        self.paths
            .iter()
            .enumerate()
            .map(|(i, p)| (ResourceId(i as u32), p.as_path()))
    }
}

impl From<Vec<PathBuf>> for ResourceTable {
    fn from(paths: Vec<PathBuf>) -> Self {
        let index = paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), ResourceId(i as u32)))
            .collect();
        Self { paths, index }
    }
}

impl From<ResourceTable> for Vec<PathBuf> {
    fn from(table: ResourceTable) -> Self {
        table.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_as_raw_roundtrip() {
        let id = ResourceId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
    }

    #[test]
    fn intern_is_idempotent() {
        let mut table = ResourceTable::new();
        let a = table.intern(Path::new("src/a.txt"));
        let b = table.intern(Path::new("src/b.txt"));
        assert_ne!(a, b);
        assert_eq!(table.intern(Path::new("src/a.txt")), a);
        assert_eq!(table.len(), 2);
        assert_eq!(table.path(b), Path::new("src/b.txt"));
    }

    #[test]
    fn get_does_not_intern() {
        let mut table = ResourceTable::new();
        assert!(table.get(Path::new("x")).is_none());
        assert!(table.is_empty());
        let id = table.intern(Path::new("x"));
        assert_eq!(table.get(Path::new("x")), Some(id));
    }

    #[test]
    fn serde_roundtrip_rebuilds_index() {
        let mut table = ResourceTable::new();
        let a = table.intern(Path::new("a"));
        let b = table.intern(Path::new("b"));
        let json = serde_json::to_string(&table).unwrap();
        let back: ResourceTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(Path::new("a")), Some(a));
        assert_eq!(back.get(Path::new("b")), Some(b));
        let ids: Vec<_> = back.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }
}
