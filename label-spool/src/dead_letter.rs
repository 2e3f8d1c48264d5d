//! Bounded, time-boxed log of permanently failed chunks
//!
//! Jobs whose chunk exhausted its delivery attempts land here instead of
//! being silently dropped. The log is capped by entry count and by age;
//! insertion always triggers cleanup, so the cap is never exceeded by more
//! than one transient entry.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::TransportError;
use crate::job::PrintJob;

/// A chunk whose delivery attempts were exhausted.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetterEntry {
    pub id: Uuid,
    /// The jobs that could not be delivered
    pub jobs: Vec<PrintJob>,
    /// The terminal error that exhausted the retries
    pub error: TransportError,
    pub recorded_at: DateTime<Utc>,
    /// Monotonic insertion time, drives retention
    #[serde(skip)]
    inserted: Instant,
}

#[derive(Debug)]
pub(crate) struct DeadLetterLog {
    entries: VecDeque<DeadLetterEntry>,
    max_entries: usize,
    retention: Duration,
}

impl DeadLetterLog {
    pub fn new(max_entries: usize, retention: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            retention,
        }
    }

    /// Record a failed chunk and clean up in the same step.
    pub fn record(&mut self, jobs: Vec<PrintJob>, error: TransportError) {
        self.entries.push_back(DeadLetterEntry {
            id: Uuid::new_v4(),
            jobs,
            error,
            recorded_at: Utc::now(),
            inserted: Instant::now(),
        });
        self.cleanup();
    }

    /// Drop entries past the retention window, then enforce the entry cap
    /// oldest-first.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        while let Some(front) = self.entries.front() {
            if now.duration_since(front.inserted) > self.retention {
                self.entries.pop_front();
            } else {
                break;
            }
        }
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<DeadLetterEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
