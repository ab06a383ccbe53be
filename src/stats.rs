//! Cache counters.
//!
//! | Counter        | Incremented when                                 |
//! |----------------|--------------------------------------------------|
//! | `compilations` | the engine compiled a pattern successfully       |
//! | `hits`         | `find` located a resident pattern                |
//! | `misses`       | `find` scanned the resident prefix without a hit |
//! | `evictions`    | a resident entry was emptied to make room        |
//!
//! Empty patterns are answered before the cache is consulted and never
//! appear in any counter.

/// Mutable counters owned by a cache.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    compilations: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_compilation(&mut self) {
        self.compilations += 1;
    }

    #[inline]
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    #[inline]
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Copies the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            compilations: self.compilations,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    /// Zeroes all four counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    pub compilations: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl StatsSnapshot {
    /// Total number of `find` calls.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit ratio in `[0, 1]`; `0.0` before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}
