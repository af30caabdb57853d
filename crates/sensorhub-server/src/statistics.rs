//! Pipeline statistics.
//!
//! Counters are bumped from every message task, so they are plain atomics
//! with relaxed ordering; a snapshot is only ever read for logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Message counters for one subscriber process.
pub struct Statistics {
    start_time: Instant,
    received: AtomicU64,
    malformed: AtomicU64,
    suppressed: AtomicU64,
    published: AtomicU64,
    publish_failures: AtomicU64,
    persisted: AtomicU64,
    persist_failures: AtomicU64,
}

/// Point-in-time copy of [`Statistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub received: u64,
    pub malformed: u64,
    pub suppressed: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub persisted: u64,
    pub persist_failures: u64,
    pub uptime: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            received: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the result of one republish attempt.
    pub fn record_publish(&self, ok: bool) {
        let counter = if ok {
            &self.published
        } else {
            &self.publish_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the result of one time-series write.
    pub fn record_persist(&self, ok: bool) {
        let counter = if ok {
            &self.persisted
        } else {
            &self.persist_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            uptime: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
