//! Loader counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of one loader.
#[derive(Debug, Default)]
pub struct LoaderStats {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    dedup_hits: AtomicU64,
    batch_count: AtomicU64,
}

impl LoaderStats {
    pub(crate) fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dedup_hit(&self) {
        self.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            dedup_hits: self.dedup_hits.load(Ordering::Relaxed),
            batch_count: self.batch_count.load(Ordering::Relaxed),
        }
    }
}

/// Loader counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStatsSnapshot {
    /// Accepted `load` calls.
    pub total_requests: u64,
    /// Calls answered from the per-execution cache.
    pub cache_hits: u64,
    /// Calls that queued a new key.
    pub cache_misses: u64,
    /// Calls that attached to a queued or in-flight key.
    pub dedup_hits: u64,
    /// Grouped statements issued.
    pub batch_count: u64,
}

impl LoaderStatsSnapshot {
    /// Share of requests answered from cache (0.0 to 1.0).
    pub fn cache_hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.total_requests)
    }

    /// Share of requests that were deduplicated (0.0 to 1.0).
    pub fn dedup_rate(&self) -> f64 {
        ratio(self.dedup_hits, self.total_requests)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = LoaderStats::default();
        assert_eq!(stats.snapshot().cache_hit_rate(), 0.0);

        for _ in 0..4 {
            stats.record_request();
        }
        stats.record_cache_hit();
        stats.record_dedup_hit();
        stats.record_dedup_hit();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cache_hit_rate(), 0.25);
        assert_eq!(snapshot.dedup_rate(), 0.5);
    }
}
