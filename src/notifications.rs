//! Notification log: append-only, cleared in full by the user.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub sequence: u64,
    pub message: String,
}

/// Sequence indices keep increasing across clears.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Vec<Notification>,
    next_sequence: u64,
}

impl NotificationLog {
    pub fn new() -> Self { Self::default() }

    pub fn append(&mut self, message: impl Into<String>) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let message = message.into();
        tracing::debug!(sequence, %message, "notification");
        self.entries.push(Notification { sequence, message });
        sequence
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[Notification] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
