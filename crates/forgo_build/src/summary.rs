//! The outcome of a committed build session.

use std::collections::BTreeMap;
use std::path::PathBuf;

use forgo_diagnostics::{Message, MessageRenderer};

/// What a build session did, returned by
/// [`BuildContext::commit`](crate::BuildContext::commit).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildSummary {
    /// Every input required processing.
    pub escalated: bool,
    /// The prior state was carried over unchanged.
    pub skipped: bool,
    /// Inputs processed in this session.
    pub processed_inputs: usize,
    /// Inputs whose previous results were carried over.
    pub carried_inputs: usize,
    /// Outputs written in this session.
    pub written_outputs: Vec<PathBuf>,
    /// Stale outputs deleted in this session.
    pub deleted_outputs: Vec<PathBuf>,
    /// Messages recorded in this session, per resource.
    pub new_messages: BTreeMap<PathBuf, Vec<Message>>,
    /// Messages of resources not processed again, replayed from the
    /// previous build.
    pub replayed_messages: BTreeMap<PathBuf, Vec<Message>>,
}

impl BuildSummary {
    /// Returns `true` if any new or replayed message has error severity.
    pub fn is_failure(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of error-severity messages, new and replayed.
    pub fn error_count(&self) -> usize {
        self.all_messages()
            .filter(|(_, message)| message.is_error())
            .count()
    }

    /// Number of messages, new and replayed.
    pub fn message_count(&self) -> usize {
        self.all_messages().count()
    }

    /// Renders every message, replayed ones first, one per line.
    pub fn render(&self, renderer: &dyn MessageRenderer) -> String {
        self.all_messages()
            .map(|(path, message)| renderer.render(path, message))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn all_messages(&self) -> impl Iterator<Item = (&PathBuf, &Message)> {
        self.replayed_messages
            .iter()
            .chain(self.new_messages.iter())
            .flat_map(|(path, messages)| messages.iter().map(move |message| (path, message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgo_diagnostics::PlainRenderer;

    fn summary() -> BuildSummary {
        let mut summary = BuildSummary::default();
        summary.replayed_messages.insert(
            PathBuf::from("src/a.txt"),
            vec![Message::warning(1, 2, "old warning")],
        );
        summary
            .new_messages
            .insert(PathBuf::from("src/b.txt"), vec![Message::info(0, 0, "note")]);
        summary
    }

    #[test]
    fn warnings_do_not_fail() {
        let summary = summary();
        assert!(!summary.is_failure());
        assert_eq!(summary.message_count(), 2);
    }

    #[test]
    fn replayed_errors_fail() {
        let mut summary = summary();
        summary
            .replayed_messages
            .get_mut(&PathBuf::from("src/a.txt"))
            .unwrap()
            .push(Message::error(3, 1, "still broken"));
        assert!(summary.is_failure());
        assert_eq!(summary.error_count(), 1);
    }

    #[test]
    fn render_lists_replayed_first() {
        let rendered = summary().render(&PlainRenderer);
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "src/a.txt:1:2: warning: old warning");
        assert_eq!(lines[1], "src/b.txt: info: note");
    }
}
