//! Per-resource build messages, severity handling, and rendering.
//!
//! Consumers attach [`Message`]s to the resources they process. The
//! [`MessageLog`] groups them per resource and tracks whether any error was
//! recorded, which is what decides the build outcome at commit.
//! [`MessageRenderer`] implementations format messages for hosts.

#![warn(missing_docs)]

pub mod log;
pub mod message;
pub mod renderer;
pub mod severity;

pub use log::MessageLog;
pub use message::Message;
pub use renderer::{JsonRenderer, MessageRenderer, PlainRenderer};
pub use severity::Severity;
