use std::collections::VecDeque;

use crate::limits::LOG_CAPACITY;
use crate::model::*;

/// Bounded activity log. New entries go to the front; once the queue is over
/// capacity the oldest entry (the back) is dropped.
#[derive(Debug, Clone)]
pub struct LogQueue {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LogQueue {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn record(&mut self, kind: LogKind, message: impl Into<String>, now: Ms) -> &LogEntry {
        self.push(LogEntry {
            kind,
            message: message.into(),
            timestamp: now,
        });
        &self.entries[0]
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn filter(&self, kind: LogKind) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
