//! Per-resource message accumulator for a build session.

use crate::message::Message;
use std::collections::BTreeMap;

/// Messages grouped per resource key, with a running error count.
///
/// A build session is single-threaded, so unlike a shared sink this log is
/// driven through `&mut self`. Keys are kept ordered so that rendering and
/// persistence are deterministic.
#[derive(Clone, Debug)]
pub struct MessageLog<K> {
    messages: BTreeMap<K, Vec<Message>>,
    error_count: usize,
}

impl<K: Ord + Clone> MessageLog<K> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
            error_count: 0,
        }
    }

    /// Appends a message to the resource's message list.
    pub fn add(&mut self, key: K, message: Message) {
        if message.is_error() {
            self.error_count += 1;
        }
        self.messages.entry(key).or_default().push(message);
    }

    /// Appends several messages, preserving their order.
    pub fn extend(&mut self, key: K, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.add(key.clone(), message);
        }
    }

    /// Removes and returns every message recorded for the resource.
    pub fn clear(&mut self, key: &K) -> Vec<Message> {
        let removed = self.messages.remove(key).unwrap_or_default();
        self.error_count -= removed.iter().filter(|m| m.is_error()).count();
        removed
    }

    /// Returns the messages recorded for the resource.
    pub fn get(&self, key: &K) -> &[Message] {
        self.messages.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if any error-severity message is recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Returns the number of error-severity messages recorded.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns the total number of messages across all resources.
    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    /// Returns `true` if no messages are recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates over resources and their messages in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Message])> {
        self.messages.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Consumes the log, returning the per-resource message map.
    pub fn into_inner(self) -> BTreeMap<K, Vec<Message>> {
        self.messages
    }
}

impl<K: Ord + Clone> Default for MessageLog<K> {
    fn default() -> Self {
        Self::new()
    }
}
