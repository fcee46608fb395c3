//! Workspace modes governing what the walker reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a workspace reports resources to the build session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every file is visited and the core computes its status.
    #[default]
    Normal,
    /// Only changed and removed files are visited; anything the walker does
    /// not report is assumed unchanged.
    Delta,
    /// Every resource is treated as new, forcing a full rebuild.
    Escalated,
    /// Configuration-only pass; no output mutation is expected.
    Suppressed,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "normal"),
            Mode::Delta => write!(f, "delta"),
            Mode::Escalated => write!(f, "escalated"),
            Mode::Suppressed => write!(f, "suppressed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_normal() {
        assert_eq!(Mode::default(), Mode::Normal);
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&Mode::Escalated).unwrap();
        assert_eq!(json, "\"escalated\"");
        let back: Mode = serde_json::from_str("\"delta\"").unwrap();
        assert_eq!(back, Mode::Delta);
    }
}
