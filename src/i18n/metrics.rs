//! Translation state metrics.
//!
//! Counters for cache usage on startup and for provider fetches. Each state
//! manager owns its own counters, so tests and parallel managers don't share
//! numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters recorded by a state manager.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Number of startups served from the persisted cache
    cache_hits: AtomicUsize,

    /// Number of startups that had to wait for the provider
    cache_misses: AtomicUsize,

    /// Number of provider fetches started
    fetches: AtomicUsize,

    /// Number of provider fetches that failed or timed out
    fetch_failures: AtomicUsize,

    /// Number of successful fetches discarded because a newer request won
    superseded: AtomicUsize,
}

impl TranslationMetrics {
    /// Create a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total_startups = hits + misses;
        let cache_hit_rate = if total_startups > 0 {
            (hits as f64 / total_startups as f64) * 100.0
        } else {
            0.0
        };

        let fetches = self.fetches.load(Ordering::Relaxed);
        let failures = self.fetch_failures.load(Ordering::Relaxed);
        let fetch_success_rate = if fetches > 0 {
            (fetches.saturating_sub(failures) as f64 / fetches as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            fetches,
            fetch_failures: failures,
            fetch_success_rate,
            superseded: self.superseded.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub fetches: usize,
    pub fetch_failures: usize,

    /// Fetch success rate as a percentage (0-100)
    pub fetch_success_rate: f64,

    pub superseded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_empty() {
        let report = TranslationMetrics::new().report();

        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.cache_misses, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert_eq!(report.fetches, 0);
        assert_eq!(report.fetch_failures, 0);
        assert_eq!(report.fetch_success_rate, 0.0);
        assert_eq!(report.superseded, 0);
    }

    #[test]
    fn test_report_cache_hit_rate() {
        let metrics = TranslationMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let report = metrics.report();
        assert_eq!(report.cache_hits, 3);
        assert_eq!(report.cache_misses, 1);
        assert_eq!(report.cache_hit_rate, 75.0);
    }

    #[test]
    fn test_report_fetch_success_rate() {
        let metrics = TranslationMetrics::new();

        // 4 fetches, 1 failure = 75% success rate
        for _ in 0..4 {
            metrics.record_fetch();
        }
        metrics.record_fetch_failure();

        let report = metrics.report();
        assert_eq!(report.fetches, 4);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.fetch_success_rate, 75.0);
    }

    #[test]
    fn test_report_all_fetches_failed() {
        let metrics = TranslationMetrics::new();

        metrics.record_fetch();
        metrics.record_fetch_failure();
        metrics.record_fetch();
        metrics.record_fetch_failure();

        assert_eq!(metrics.report().fetch_success_rate, 0.0);
    }

    #[test]
    fn test_instances_are_independent() {
        let first = TranslationMetrics::new();
        let second = TranslationMetrics::new();

        first.record_superseded();

        assert_eq!(first.report().superseded, 1);
        assert_eq!(second.report().superseded, 0);
    }

    #[test]
    fn test_report_serializes() {
        let metrics = TranslationMetrics::new();
        metrics.record_cache_hit();

        let json = serde_json::to_value(metrics.report()).expect("Should serialize");
        assert_eq!(json["cache_hits"], 1);
        assert_eq!(json["cache_hit_rate"], 100.0);
    }
}
