//! Qualified names for requirements and capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(qualifier, local_name)` pair.
///
/// Outputs provide capabilities and inputs declare requirements using the
/// same type; an input depends on an output when a requirement of the input
/// equals a capability of the output. A Java-like consumer would use
/// qualifiers such as `"type"` or `"package"` with fully qualified symbol
/// names as the local name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace of the name, e.g. `"type"`.
    pub qualifier: String,
    /// The name within the qualifier's namespace.
    pub local_name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(qualifier: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.qualifier, self.local_name)
    }
}
