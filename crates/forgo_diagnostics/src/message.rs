//! A single diagnostic message attached to a resource.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A diagnostic produced while processing a resource.
///
/// Messages are data, not failures: they are stored per resource, persisted
/// with the build state, and replayed on later builds until the resource is
/// processed again. Line and column are 1-based; `0` means "unknown".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 1-based line, or 0 when the message applies to the whole resource.
    pub line: u32,
    /// 1-based column, or 0 when unknown.
    pub column: u32,
    /// The message text.
    pub text: String,
    /// The severity level of this message.
    pub severity: Severity,
    /// Rendered description of the underlying cause, if any.
    pub cause: Option<String>,
}

impl Message {
    /// Creates a message with the given severity and location.
    pub fn new(line: u32, column: u32, text: impl Into<String>, severity: Severity) -> Self {
        Self {
            line,
            column,
            text: text.into(),
            severity,
            cause: None,
        }
    }

    /// Creates an error message.
    pub fn error(line: u32, column: u32, text: impl Into<String>) -> Self {
        Self::new(line, column, text, Severity::Error)
    }

    /// Creates a warning message.
    pub fn warning(line: u32, column: u32, text: impl Into<String>) -> Self {
        Self::new(line, column, text, Severity::Warning)
    }

    /// Creates an informational message.
    pub fn info(line: u32, column: u32, text: impl Into<String>) -> Self {
        Self::new(line, column, text, Severity::Info)
    }

    /// Attaches a cause to this message.
    pub fn with_cause(mut self, cause: impl ToString) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Returns `true` if this message has error severity.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}
