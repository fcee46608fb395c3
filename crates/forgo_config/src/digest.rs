//! Stable digests over build step parameters.

use std::collections::{BTreeMap, BTreeSet};

use forgo_common::{ContentHash, ContentHasher};

/// The parameters of a build step that decide whether prior build state
/// is still trustworthy.
///
/// Keys are digested in sorted order so the result is independent of
/// insertion order. Excluded keys (output locations, verbosity flags and the
/// like) are recorded but left out of the digest, so changing them does not
/// force a full rebuild.
///
/// ```
/// use forgo_config::ConfigurationDigest;
///
/// let a = ConfigurationDigest::new().with("level", 2).with("log", "quiet").exclude("log");
/// let b = ConfigurationDigest::new().with("log", "loud").with("level", 2).exclude("log");
/// assert_eq!(a.finish(), b.finish());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigurationDigest {
    values: BTreeMap<String, serde_json::Value>,
    excluded: BTreeSet<String>,
}

impl ConfigurationDigest {
    /// Creates a digest with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Excludes `key` from the digest.
    pub fn exclude(mut self, key: impl Into<String>) -> Self {
        self.excluded.insert(key.into());
        self
    }

    /// Adds a parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the value recorded for `key`, excluded or not.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Returns `true` if `key` is left out of the digest.
    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded.contains(key)
    }

    /// Computes the digest over all non-excluded parameters.
    pub fn finish(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        for (key, value) in &self.values {
            if self.excluded.contains(key) {
                continue;
            }
            hasher.update_str(key);
            // serde_json maps are key-ordered, so nested objects render canonically.
            hasher.update_str(&value.to_string());
        }
        hasher.finish()
    }
}
