//! Query plumbing: cooperative cancellation and performance counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

// ── Cancellation ─────────────────────────────────────────────────────────────

/// A pollable cancellation token.
///
/// `is_cancelled` must never block: it is polled between archives (and,
/// inside section readers, between index blocks).  Cancellation is purely
/// cooperative — a cancelled query returns a well-formed partial result.
pub trait QueryController: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// The plain flag implementation: set once, observed by every poll.
#[derive(Debug, Default)]
pub struct CancellationFlag(AtomicBool);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl QueryController for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ── Metrics ──────────────────────────────────────────────────────────────────

/// Counters accumulated by one (or more) map object queries.
///
/// The aggregate is caller-owned and passed by mutable reference; it keeps
/// accumulating even when the query is cancelled or an archive turns out
/// to be malformed, so a partial scan still accounts for the work it did.
/// The core only ever increments these fields — they never steer control
/// flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadMapObjectsMetric {
    pub archives_visited: u32,
    pub blocks_read:      u32,
    pub bytes_read:       u64,
    pub cache_hits:       u32,
    pub cache_misses:     u32,
    pub objects_visited:  u32,
    pub objects_accepted: u32,
    pub objects_rejected: u32,
    pub elapsed:          Duration,
}

impl LoadMapObjectsMetric {
    /// Fold another aggregate into this one, field by field.
    pub fn add(&mut self, other: &LoadMapObjectsMetric) {
        self.archives_visited += other.archives_visited;
        self.blocks_read += other.blocks_read;
        self.bytes_read += other.bytes_read;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.objects_visited += other.objects_visited;
        self.objects_accepted += other.objects_accepted;
        self.objects_rejected += other.objects_rejected;
        self.elapsed += other.elapsed;
    }

    /// One-line digest for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} archive(s), {} block(s) / {} byte(s) read, \
             {} hit(s) / {} miss(es), {}/{} object(s) accepted in {:.1?}",
            self.archives_visited,
            self.blocks_read,
            self.bytes_read,
            self.cache_hits,
            self.cache_misses,
            self.objects_accepted,
            self.objects_visited,
            self.elapsed,
        )
    }

    /// JSON export for external diagnostics sinks.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear_and_latches() {
        let flag = CancellationFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn add_is_fieldwise() {
        let mut a = LoadMapObjectsMetric {
            archives_visited: 1,
            objects_visited: 10,
            objects_accepted: 7,
            objects_rejected: 3,
            elapsed: Duration::from_millis(5),
            ..Default::default()
        };
        let b = LoadMapObjectsMetric {
            archives_visited: 2,
            objects_visited: 4,
            objects_accepted: 4,
            elapsed: Duration::from_millis(3),
            ..Default::default()
        };
        a.add(&b);
        assert_eq!(a.archives_visited, 3);
        assert_eq!(a.objects_visited, 14);
        assert_eq!(a.objects_accepted, 11);
        assert_eq!(a.objects_rejected, 3);
        assert_eq!(a.elapsed, Duration::from_millis(8));
    }

    #[test]
    fn json_export_carries_every_counter() {
        let metric = LoadMapObjectsMetric {
            cache_hits: 2,
            cache_misses: 5,
            bytes_read: 4096,
            ..Default::default()
        };
        let json = metric.to_json().unwrap();
        assert!(json.contains("\"cache_hits\":2"));
        assert!(json.contains("\"cache_misses\":5"));
        assert!(json.contains("\"bytes_read\":4096"));
    }
}
