// src/services/history.rs
use crate::models::HistoryCall;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 100;
pub const DEFAULT_RETENTION_HOURS: i64 = 7 * 24;

/// Count and age limits applied to the history log after every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    max_entries: usize,
    retention: Duration,
}

impl HistoryLimits {
    /// Non-positive values fall back to the defaults.
    pub fn new(max_entries: i64, retention_hours: i64) -> Self {
        let max_entries = if max_entries > 0 {
            max_entries as usize
        } else {
            DEFAULT_MAX_HISTORY
        };
        let retention_hours = if retention_hours > 0 {
            retention_hours
        } else {
            DEFAULT_RETENTION_HOURS
        };
        Self {
            max_entries,
            retention: Duration::hours(retention_hours),
        }
    }

    pub fn with_retention(max_entries: usize, retention: Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            retention,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Oldest end time still retained at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Finished calls, newest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    limits: HistoryLimits,
    entries: VecDeque<HistoryCall>,
}

impl HistoryStore {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            limits,
            entries: VecDeque::new(),
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Adds a just-finished call in front of the log.
    pub fn record(&mut self, call: HistoryCall, now: DateTime<Utc>) {
        self.entries.push_front(call);
        self.prune(now);
    }

    /// Swaps the whole log, e.g. after a CDR import.
    pub fn replace(&mut self, mut calls: Vec<HistoryCall>, now: DateTime<Utc>) {
        calls.sort_by(|a, b| b.end.cmp(&a.end));
        self.entries = calls.into();
        self.prune(now);
    }

    /// Drops entries that ended before the retention cutoff, then caps the
    /// count, keeping the newest.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = self.limits.cutoff(now);
        self.entries.retain(|call| call.end >= cutoff);
        self.entries.truncate(self.limits.max_entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryCall> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryCall> {
        self.entries.iter().cloned().collect()
    }
}
