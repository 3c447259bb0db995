//! Lookup observability counters.
//!
//! Tracks catalog cache behavior and cascade outcomes so operators can
//! see whether the shared cache is doing its job and how often keys
//! exhaust their cascade.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Global lookup metrics singleton.
pub struct LookupMetrics {
    /// Number of catalog lookups answered by the shared cache
    cache_hits: AtomicUsize,

    /// Number of catalog lookups that missed the shared cache
    cache_misses: AtomicUsize,

    /// Number of catalogs parsed through the resource loader
    catalog_loads: AtomicUsize,

    /// Number of keys that exhausted their whole cascade
    cascade_misses: AtomicUsize,
}

/// Global metrics instance (initialized lazily)
static METRICS: OnceLock<LookupMetrics> = OnceLock::new();

impl LookupMetrics {
    /// Create a standalone counter set, e.g. for scoped measurements.
    /// Production lookups record into [`LookupMetrics::global`].
    pub fn new() -> Self {
        LookupMetrics {
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            catalog_loads: AtomicUsize::new(0),
            cascade_misses: AtomicUsize::new(0),
        }
    }

    /// Get the global lookup metrics instance.
    pub fn global() -> &'static LookupMetrics {
        METRICS.get_or_init(LookupMetrics::new)
    }

    /// Record a catalog found in the shared cache.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a catalog missing from the shared cache.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a catalog parsed through the resource loader.
    pub fn record_catalog_load(&self) {
        self.catalog_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a key that was not found anywhere in its cascade.
    pub fn record_cascade_miss(&self) {
        self.cascade_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn catalog_loads(&self) -> usize {
        self.catalog_loads.load(Ordering::Relaxed)
    }

    pub fn cascade_misses(&self) -> usize {
        self.cascade_misses.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_cache_queries = hits + misses;
        let cache_hit_rate = if total_cache_queries > 0 {
            (hits as f64 / total_cache_queries as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            catalog_loads: self.catalog_loads(),
            cascade_misses: self.cascade_misses(),
        }
    }
}

impl Default for LookupMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the current lookup statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Number of cache hits
    pub cache_hits: usize,

    /// Number of cache misses
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    /// Number of catalogs parsed through the loader
    pub catalog_loads: usize,

    /// Number of keys that exhausted their cascade
    pub cascade_misses: usize,
}
