// ═══════════════════════════════════════════════════════════════
// METRICS - what the sweep actually did on the wire
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters, bumped by the fetcher and the paginator, read back as a
// serializable snapshot once a run finishes. Cheap enough to leave on always.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Point-in-time copy of the counters
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub retries: u64,
    pub pages_fetched: u64,
    pub pages_not_found: u64,
    pub pages_exhausted: u64,
    pub parse_misses: u64,
    pub raw_tickers_extracted: u64,
    pub queries_completed: u64,
    pub elapsed_seconds: f64,
}

pub struct ScrapeMetrics {
    requests_sent: AtomicU64,
    retries: AtomicU64,
    pages_fetched: AtomicU64,
    pages_not_found: AtomicU64,
    pages_exhausted: AtomicU64,
    parse_misses: AtomicU64,
    raw_tickers_extracted: AtomicU64,
    queries_completed: AtomicU64,
    start_time: Instant,
}

impl Default for ScrapeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeMetrics {
    pub fn new() -> Self {
        Self {
            requests_sent: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            pages_fetched: AtomicU64::new(0),
            pages_not_found: AtomicU64::new(0),
            pages_exhausted: AtomicU64::new(0),
            parse_misses: AtomicU64::new(0),
            raw_tickers_extracted: AtomicU64::new(0),
            queries_completed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_requests(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pages_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_not_found(&self) {
        self.pages_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_exhausted(&self) {
        self.pages_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parse_misses(&self) {
        self.parse_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_raw_tickers(&self, count: usize) {
        self.raw_tickers_extracted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn increment_queries_completed(&self) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_not_found: self.pages_not_found.load(Ordering::Relaxed),
            pages_exhausted: self.pages_exhausted.load(Ordering::Relaxed),
            parse_misses: self.parse_misses.load(Ordering::Relaxed),
            raw_tickers_extracted: self.raw_tickers_extracted.load(Ordering::Relaxed),
            queries_completed: self.queries_completed.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let snap = ScrapeMetrics::new().snapshot();
        assert_eq!(snap.requests_sent, 0);
        assert_eq!(snap.retries, 0);
        assert_eq!(snap.raw_tickers_extracted, 0);
    }

    #[test]
    fn test_snapshot_reflects_increments() {
        let metrics = ScrapeMetrics::new();
        metrics.increment_requests();
        metrics.increment_requests();
        metrics.increment_retries();
        metrics.add_raw_tickers(20);
        metrics.add_raw_tickers(7);
        let snap = metrics.snapshot();
        assert_eq!(snap.requests_sent, 2);
        assert_eq!(snap.retries, 1);
        assert_eq!(snap.raw_tickers_extracted, 27);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["requests_sent"], 2);
    }
}
