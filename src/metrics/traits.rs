//! # Metrics Traits
//!
//! Recording lives in [`crate::stats::CacheStats`]; these traits cover the
//! read side: snapshotting, resetting and exporting.
//!
//! ```text
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │───►│ MetricsExporter<S>           │
//!   │ (PatternCache, shared cache) │    │ (PrometheusTextExporter)     │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```

use crate::cache::PatternCache;
use crate::engine::RegexEngine;
use crate::stats::StatsSnapshot;

/// Snapshot provider for monitoring, benches and tests.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset counters between benchmark iterations or on operator request.
pub trait MetricsReset {
    fn reset_metrics(&mut self);
}

/// Export/publish metrics to a monitoring backend.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}

/// Counters plus occupancy at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub stats: StatsSnapshot,
    pub cache_len: usize,
    pub capacity: usize,
    pub jit_initialized: bool,
}

impl<E: RegexEngine> MetricsSnapshotProvider<CacheMetricsSnapshot> for PatternCache<E> {
    fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            stats: self.stats(),
            cache_len: self.len(),
            capacity: self.capacity(),
            jit_initialized: self.jit_initialized(),
        }
    }
}

impl<E: RegexEngine> MetricsReset for PatternCache<E> {
    fn reset_metrics(&mut self) {
        self.reset_stats();
    }
}

#[cfg(feature = "concurrency")]
impl<E: RegexEngine> MetricsSnapshotProvider<CacheMetricsSnapshot>
    for crate::shared::SharedPatternCache<E>
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.with_cache(|cache| cache.snapshot())
    }
}

#[cfg(feature = "concurrency")]
impl<E: RegexEngine> MetricsReset for crate::shared::SharedPatternCache<E> {
    fn reset_metrics(&mut self) {
        self.reset_stats();
    }
}
