//! Message rendering backends for human-readable and machine-readable output.

use crate::message::Message;
use std::path::Path;

/// Trait for rendering a resource's message into a formatted string.
pub trait MessageRenderer {
    /// Renders a single message attached to `resource`.
    fn render(&self, resource: &Path, message: &Message) -> String;
}

/// Renders messages in the conventional compiler format.
///
/// Produces output like:
/// ```text
/// src/main.txt:10:5: error: unexpected token
///   caused by: unterminated string
/// ```
/// Unknown positions (0) are omitted from the location prefix.
pub struct PlainRenderer;

impl MessageRenderer for PlainRenderer {
    fn render(&self, resource: &Path, message: &Message) -> String {
        let mut out = resource.display().to_string();
        if message.line > 0 {
            out.push_str(&format!(":{}", message.line));
            if message.column > 0 {
                out.push_str(&format!(":{}", message.column));
            }
        }
        out.push_str(&format!(": {}: {}", message.severity, message.text));
        if let Some(cause) = &message.cause {
            out.push_str(&format!("\n  caused by: {cause}"));
        }
        out
    }
}

/// Renders each message as a single-line JSON object.
pub struct JsonRenderer;

impl MessageRenderer for JsonRenderer {
    fn render(&self, resource: &Path, message: &Message) -> String {
        serde_json::json!({
            "resource": resource.display().to_string(),
            "line": message.line,
            "column": message.column,
            "severity": message.severity.to_string(),
            "text": message.text,
            "cause": message.cause,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_with_position() {
        let msg = Message::error(10, 5, "unexpected token");
        let out = PlainRenderer.render(Path::new("src/a.txt"), &msg);
        assert_eq!(out, "src/a.txt:10:5: error: unexpected token");
    }

    #[test]
    fn plain_without_position() {
        let msg = Message::warning(0, 0, "file is empty");
        let out = PlainRenderer.render(Path::new("a.txt"), &msg);
        assert_eq!(out, "a.txt: warning: file is empty");
    }

    #[test]
    fn plain_with_cause() {
        let msg = Message::error(1, 0, "failed").with_cause("disk full");
        let out = PlainRenderer.render(Path::new("a.txt"), &msg);
        assert!(out.starts_with("a.txt:1: error: failed"));
        assert!(out.contains("caused by: disk full"));
    }

    #[test]
    fn json_is_parseable() {
        let msg = Message::info(2, 3, "note this");
        let out = JsonRenderer.render(Path::new("b.txt"), &msg);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["resource"], "b.txt");
        assert_eq!(value["line"], 2);
        assert_eq!(value["severity"], "info");
        assert!(value["cause"].is_null());
    }
}
