//! regexkit: a bounded cache of compiled regular expressions for SQL
//! `REGEXP` / `IREGEXP` functions.
//!
//! A [`PatternCache`](cache::PatternCache) keeps up to `capacity` compiled
//! matchers in most-recently-used order. Entries can be pinned while a
//! caller holds on to them, pinned entries are never evicted, and all
//! JIT-compiled matchers share one lazily created match scratch.
//!
//! ```
//! use regexkit::prelude::*;
//!
//! let mut cache = CacheBuilder::new(8)
//!     .jit_stack_size(32 * 1024, 64 * 1024)
//!     .try_build(AutomataEngine::new())
//!     .unwrap();
//! assert!(cache.matches(b"^[0-9]+$", CaseMode::Sensitive, b"2024").unwrap());
//! assert!(cache.matches(b"^[0-9]+$", CaseMode::Sensitive, b"12").unwrap());
//! assert_eq!(cache.stats().hits, 1);
//! ```
//!
//! The [`host`] module layers the SQL calling convention on top, and
//! `shared::SharedPatternCache` (feature `concurrency`) puts one cache
//! behind a mutex for multi-threaded hosts.

pub mod builder;
pub mod cache;
pub mod display;
pub mod ds;
pub mod engine;
pub mod entry;
pub mod error;
pub mod host;
pub mod jit;
pub mod pattern;
pub mod pin;
pub mod prelude;
pub mod stats;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "concurrency")]
pub mod shared;
