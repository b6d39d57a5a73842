use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for tracking edge index reads and repairs.
///
/// Implementations collect statistics about adjacency scans, cache use,
/// decoded rows and stale-row repair. Counts are advisory; nothing in the
/// read path depends on them.
pub trait IndexMetrics: Send + Sync {
    /// Records an underlying store scan.
    ///
    /// # Parameters
    /// * `kind` - Plan kind: "primary", "created_at", "secondary" or "fallback".
    fn scan_issued(&self, kind: &'static str);

    /// Records an adjacency query answered from a vertex cache.
    fn cache_hit(&self);

    /// Records an adjacency query that had to reach the store.
    fn cache_miss(&self);

    /// Records a row key decoded into an edge.
    fn row_decoded(&self);

    /// Records a decoded edge rejected by a client-side predicate.
    fn row_filtered(&self);

    /// Records a row referencing a missing edge or vertex.
    fn stale_detected(&self);

    /// Records a repair mutation issued for a stale row.
    fn repair_issued(&self);

    /// Records a repair mutation that failed and was swallowed.
    fn repair_failed(&self);
}

/// A no-op implementation of [`IndexMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl IndexMetrics for NoopMetrics {
    fn scan_issued(&self, _kind: &'static str) {}
    fn cache_hit(&self) {}
    fn cache_miss(&self) {}
    fn row_decoded(&self) {}
    fn row_filtered(&self) {}
    fn stale_detected(&self) {}
    fn repair_issued(&self) {}
    fn repair_failed(&self) {}
}

/// A thread-safe counter-based implementation of [`IndexMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Scans over primary rows without a value bound.
    pub scans_primary: AtomicU64,

    /// Scans over primary rows bounded by creation time.
    pub scans_created_at: AtomicU64,

    /// Scans over secondary index rows.
    pub scans_secondary: AtomicU64,

    /// Primary scans followed by a client-side predicate.
    pub scans_fallback: AtomicU64,

    /// Queries served from an adjacency cache.
    pub cache_hits: AtomicU64,

    /// Queries that scanned the store.
    pub cache_misses: AtomicU64,

    /// Row keys decoded.
    pub rows_decoded: AtomicU64,

    /// Decoded edges dropped by a client-side predicate.
    pub rows_filtered: AtomicU64,

    /// Rows found to reference missing elements.
    pub stale_detected: AtomicU64,

    /// Repair mutations issued.
    pub repairs_issued: AtomicU64,

    /// Repair mutations that failed.
    pub repairs_failed: AtomicU64,
}

impl CounterMetrics {
    /// Total scans issued across all plan kinds.
    pub fn scans_total(&self) -> u64 {
        self.scans_primary.load(Ordering::Relaxed)
            + self.scans_created_at.load(Ordering::Relaxed)
            + self.scans_secondary.load(Ordering::Relaxed)
            + self.scans_fallback.load(Ordering::Relaxed)
    }
}

impl IndexMetrics for CounterMetrics {
    fn scan_issued(&self, kind: &'static str) {
        match kind {
            "primary" => {
                self.scans_primary.fetch_add(1, Ordering::Relaxed);
            }
            "created_at" => {
                self.scans_created_at.fetch_add(1, Ordering::Relaxed);
            }
            "secondary" => {
                self.scans_secondary.fetch_add(1, Ordering::Relaxed);
            }
            "fallback" => {
                self.scans_fallback.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn row_decoded(&self) {
        self.rows_decoded.fetch_add(1, Ordering::Relaxed);
    }

    fn row_filtered(&self) {
        self.rows_filtered.fetch_add(1, Ordering::Relaxed);
    }

    fn stale_detected(&self) {
        self.stale_detected.fetch_add(1, Ordering::Relaxed);
    }

    fn repair_issued(&self) {
        self.repairs_issued.fetch_add(1, Ordering::Relaxed);
    }

    fn repair_failed(&self) {
        self.repairs_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default implementation is [`NoopMetrics`], which discards everything.
pub fn default_metrics() -> Arc<dyn IndexMetrics> {
    Arc::new(NoopMetrics)
}
