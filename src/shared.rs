//! Thread-shared pattern cache.
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                  SharedPatternCache<E>                       │
//!   │                                                              │
//!   │   Arc<parking_lot::Mutex<PatternCache<E>>>                   │
//!   │        │                                                     │
//!   │        ├── find / compile / insert_or_evict / evict          │
//!   │        ├── JIT scratch initialization                        │
//!   │        └── is_match (the scratch is shared per cache)        │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation, including the match itself, runs under one mutex, so two
//! matches on the same cache never overlap. Callers that want parallel
//! matching give each thread its own [`PatternCache`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::builder::CacheConfig;
use crate::cache::PatternCache;
use crate::engine::RegexEngine;
use crate::entry::EntryId;
use crate::error::{ConfigError, InvariantError, RegexpError};
use crate::pattern::{CaseMode, Pattern};
use crate::pin::Held;
use crate::stats::StatsSnapshot;

/// A [`PatternCache`] behind an `Arc<Mutex<_>>`; cheap to clone.
pub struct SharedPatternCache<E: RegexEngine> {
    inner: Arc<Mutex<PatternCache<E>>>,
}

impl<E: RegexEngine> Clone for SharedPatternCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: RegexEngine> fmt::Debug for SharedPatternCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("SharedPatternCache")
            .field("len", &cache.len())
            .field("capacity", &cache.capacity())
            .finish_non_exhaustive()
    }
}

impl<E: RegexEngine> From<PatternCache<E>> for SharedPatternCache<E> {
    fn from(cache: PatternCache<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }
}

impl<E: RegexEngine> SharedPatternCache<E> {
    /// Creates a shared cache with the default configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use regexkit::prelude::*;
    ///
    /// let cache = SharedPatternCache::new(AutomataEngine::new());
    /// let worker = cache.clone();
    /// let handle = std::thread::spawn(move || {
    ///     worker.matches(b"^\\d+$", CaseMode::Sensitive, b"12345").unwrap()
    /// });
    /// assert!(handle.join().unwrap());
    /// assert_eq!(cache.len(), 1);
    /// ```
    pub fn new(engine: E) -> Self {
        PatternCache::new(engine).into()
    }

    pub fn with_config(engine: E, config: CacheConfig) -> Result<Self, ConfigError> {
        PatternCache::with_config(engine, config).map(Self::from)
    }

    pub fn matches(
        &self,
        pattern: &[u8],
        case: CaseMode,
        subject: &[u8],
    ) -> Result<bool, RegexpError> {
        self.inner.lock().matches(pattern, case, subject)
    }

    /// Pins `pattern` for use across calls; see [`SharedLease`].
    pub fn lease(&self, pattern: &[u8], case: CaseMode) -> Result<SharedLease<E>, RegexpError> {
        let held = Held::resolve(&mut *self.inner.lock(), pattern, case)?;
        Ok(SharedLease {
            cache: Arc::clone(&self.inner),
            pattern: Pattern::new(pattern, case),
            held,
        })
    }

    /// Runs `f` with exclusive access to the underlying cache.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut PatternCache<E>) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.lock().stats()
    }

    pub fn reset_stats(&self) {
        self.inner.lock().reset_stats();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn jit_initialized(&self) -> bool {
        self.inner.lock().jit_initialized()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

/// A pinned pattern bound to a [`SharedPatternCache`]; released on drop.
pub struct SharedLease<E: RegexEngine> {
    cache: Arc<Mutex<PatternCache<E>>>,
    pattern: Pattern,
    held: Held<E::Matcher>,
}

impl<E: RegexEngine> SharedLease<E> {
    pub fn is_match(&self, subject: &[u8]) -> Result<bool, RegexpError> {
        self.held.is_match(&mut *self.cache.lock(), subject)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn entry(&self) -> Option<EntryId> {
        match &self.held {
            Held::Pinned(Some(pin)) => Some(pin.entry()),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.held.is_transient()
    }
}

impl<E: RegexEngine> Drop for SharedLease<E> {
    fn drop(&mut self) {
        if let Some(pin) = self.held.take_pin() {
            self.cache.lock().release(pin);
        }
    }
}

impl<E: RegexEngine> fmt::Debug for SharedLease<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLease")
            .field("pattern", &self.pattern)
            .field("entry", &self.entry())
            .finish_non_exhaustive()
    }
}
