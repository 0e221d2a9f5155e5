// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded ring buffer of health log entries.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vidra_core::LogLevel;

/// A single observational log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Append-only log that evicts its oldest entry once full.
#[derive(Debug, Clone)]
pub struct HealthLog {
    entries: VecDeque<HealthLogEntry>,
    capacity: usize,
}

impl HealthLog {
    /// Creates an empty log. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HealthLogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        });
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &HealthLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = HealthLog::new(3);
        for i in 0..5 {
            log.push(LogLevel::Info, format!("entry {i}"));
        }
        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn zero_capacity_keeps_latest_entry() {
        let mut log = HealthLog::new(0);
        log.push(LogLevel::Warn, "first");
        log.push(LogLevel::Error, "second");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.entries().next().unwrap().message, "second");
    }

    #[test]
    fn starts_empty() {
        let log = HealthLog::new(100);
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 100);
    }
}
