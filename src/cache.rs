//! # Compiled Pattern Cache
//!
//! A bounded, recency-ordered cache of compiled matchers. Every slot is
//! allocated when the cache is built; lookups scan the ring from the MRU end
//! and stop at the first Empty slot, so cost is bounded by the number of
//! resident patterns.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────────┐
//!   │                       PatternCache<E>                              │
//!   │                                                                    │
//!   │   SlotRing<CacheEntry<E::Matcher>>                                 │
//!   │                                                                    │
//!   │   root ──► [p3 rc=0] ◄──► [p1 rc=2] ◄──► [p7 rc=0] ◄──► [ ] ◄──► [ ]│
//!   │            MRU                               LRU     Empty suffix  │
//!   │            └──────────── Active prefix ───────┘                    │
//!   │                                                                    │
//!   │   JitContext<E::Scratch>   Uninitialized | Ready(scratch)          │
//!   │   CacheStats               compilations hits misses evictions      │
//!   └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations Flow
//!
//! ```text
//!   matches(p, case, subject)
//!   ═══════════════════════════════════════════════════════════════════════
//!     empty p ─────────────────────────────────────────────► true
//!     find(p) ── hit ──► move_to_front ─────────────────────► is_match
//!        │
//!        └── miss ──► compile ──► jit_compile ──► insert_or_evict
//!                                                   │
//!              first Empty slot ◄───────────────────┤
//!              else evict LRU entry with rc == 0 ◄──┤
//!              else every slot pinned: transient ◄──┘ (used once, not cached)
//! ```
//!
//! ## Slot States
//!
//! ```text
//!   Empty ──insert──► Active(0) ──acquire──► Active(k) ──release──► Active(0)
//!     ▲                  │                                             │
//!     └──── evict ───────┘◄────────────────────────────────────────────┘
//! ```
//!
//! Eviction only fires at refcount 0. Releasing the last pin moves the entry
//! to the MRU end. Evicting moves the slot to the back, keeping Active
//! entries a prefix of the ring.
//!
//! ## Concurrency
//!
//! `PatternCache` takes `&mut self` and has no internal locking. Wrap it in
//! `Rc<RefCell<_>>` for one cache per connection, or use
//! [`SharedPatternCache`](crate::shared::SharedPatternCache) to share one
//! cache between threads.

use std::fmt;

use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use crate::builder::CacheConfig;
use crate::display::truncate_for_display;
use crate::ds::{SlotId, SlotRing};
use crate::engine::{CompileFlags, EngineError, JitStatus, RegexEngine};
use crate::entry::{CacheEntry, Compiled, EntryId, EntryState, EntryView, Resident};
use crate::error::{ConfigError, InvariantError, RegexpError};
use crate::jit::JitContext;
use crate::pattern::{CaseMode, Pattern, PatternKey};
use crate::pin::Pin;
use crate::stats::{CacheStats, StatsSnapshot};

/// Result of [`PatternCache::get_or_compile`].
#[derive(Debug)]
pub enum Resolved<M> {
    /// The pattern is resident under this handle.
    Resident(EntryId),
    /// Every slot was pinned; the matcher is valid for this call only.
    Transient(Compiled<M>),
}

/// Bounded LRU cache of compiled matchers with pinning and lazy JIT scratch.
pub struct PatternCache<E: RegexEngine> {
    // Declared first so the scratch is released before the matchers.
    jit: JitContext<E::Scratch>,
    ring: SlotRing<CacheEntry<E::Matcher>>,
    engine: E,
    stats: CacheStats,
    config: CacheConfig,
    len: usize,
    epoch: u64,
}

impl<E: RegexEngine> PatternCache<E> {
    /// Creates a cache with the default configuration (16 slots).
    pub fn new(engine: E) -> Self {
        Self::from_valid_config(engine, CacheConfig::default())
    }

    pub fn with_config(engine: E, config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(engine, config))
    }

    fn from_valid_config(engine: E, config: CacheConfig) -> Self {
        Self {
            jit: JitContext::Uninitialized,
            ring: SlotRing::from_fn(config.capacity, |_| CacheEntry::empty()),
            engine,
            stats: CacheStats::new(),
            config,
            len: 0,
            epoch: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lookup and insertion
    // -----------------------------------------------------------------------

    /// Looks up a resident pattern, moving it to the MRU end on a hit.
    pub fn find(&mut self, pattern: &[u8], case: CaseMode) -> Option<EntryId> {
        match self.locate(&PatternKey::new(pattern, case)) {
            Some(id) => {
                self.ring.move_to_front(id.slot);
                self.stats.record_hit();
                Some(id)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn locate(&self, key: &PatternKey<'_>) -> Option<EntryId> {
        for (slot, entry) in self.ring.iter() {
            let Some(resident) = &entry.resident else {
                break;
            };
            if resident.pattern.matches_key(key) {
                return Some(EntryId {
                    slot,
                    epoch: entry.epoch,
                });
            }
        }
        None
    }

    /// Compiles `pattern` with the baseline flags and attempts JIT.
    ///
    /// A failed JIT compile degrades the matcher silently. The first matcher
    /// whose JIT compile succeeds creates the cache's scratch; if that
    /// allocation fails the matcher is dropped and the error returned.
    pub fn compile(
        &mut self,
        pattern: &[u8],
        case: CaseMode,
    ) -> Result<Compiled<E::Matcher>, RegexpError> {
        let mut matcher = self
            .engine
            .compile(pattern, CompileFlags::baseline(case))
            .map_err(|err| {
                debug!(error = %err, len = pattern.len(), "pattern failed to compile");
                compile_error(&self.config, pattern, err)
            })?;

        let stack = self.config.jit_stack;
        let jit_active = match self.engine.jit_compile(&mut matcher, stack) {
            JitStatus::Active => {
                if !self.jit.is_ready() {
                    let engine = &self.engine;
                    if let Err(err) = self.jit.ensure_with(|| engine.create_scratch(stack)) {
                        warn!(error = %err, "failed to allocate JIT scratch");
                        drop(matcher);
                        return Err(compile_error(&self.config, pattern, err));
                    }
                    debug!(start = stack.start, max = stack.max, "JIT scratch initialized");
                }
                true
            }
            JitStatus::Degraded(reason) => {
                debug!(%reason, "JIT unavailable, matcher degraded");
                false
            }
        };

        self.stats.record_compilation();
        Ok(Compiled {
            pattern: Pattern::new(pattern, case),
            matcher,
            jit_active,
        })
    }

    /// Places a compiled matcher in the cache.
    ///
    /// Takes the first Empty slot, else evicts the least recently used
    /// unpinned entry. If the pattern is already resident the new matcher is
    /// dropped and the existing handle returned. When every slot is pinned
    /// the compiled matcher is handed back unchanged.
    pub fn insert_or_evict(
        &mut self,
        compiled: Compiled<E::Matcher>,
    ) -> Result<EntryId, Compiled<E::Matcher>> {
        if let Some(id) = self.locate(&compiled.pattern.key()) {
            self.ring.move_to_front(id.slot);
            return Ok(id);
        }

        let slot = match self.first_empty_slot() {
            Some(slot) => slot,
            None => match self.lru_unpinned() {
                Some(victim) => {
                    self.evict_slot(victim.slot);
                    victim.slot
                }
                None => {
                    warn!(
                        capacity = self.capacity(),
                        "every cache slot is pinned, matcher will not be cached"
                    );
                    return Err(compiled);
                }
            },
        };

        self.epoch += 1;
        let epoch = self.epoch;
        let Some(entry) = self.ring.get_mut(slot) else {
            return Err(compiled);
        };
        entry.activate(compiled, epoch);
        self.ring.move_to_front(slot);
        self.len += 1;
        trace!(slot = slot.index(), epoch, "pattern inserted");
        Ok(EntryId { slot, epoch })
    }

    /// Finds `pattern`, compiling and inserting it on a miss.
    ///
    /// Does not special-case the empty pattern; callers that want the
    /// match-everything shortcut use [`PatternCache::matches`].
    pub fn get_or_compile(
        &mut self,
        pattern: &[u8],
        case: CaseMode,
    ) -> Result<Resolved<E::Matcher>, RegexpError> {
        if let Some(id) = self.find(pattern, case) {
            return Ok(Resolved::Resident(id));
        }
        let compiled = self.compile(pattern, case)?;
        Ok(match self.insert_or_evict(compiled) {
            Ok(id) => Resolved::Resident(id),
            Err(compiled) => Resolved::Transient(compiled),
        })
    }

    fn first_empty_slot(&self) -> Option<SlotId> {
        if self.len == self.capacity() {
            return None;
        }
        self.ring
            .iter()
            .find(|(_, entry)| !entry.is_active())
            .map(|(slot, _)| slot)
    }

    fn lru_unpinned(&self) -> Option<EntryId> {
        self.ring.iter_ids_rev().find_map(|slot| {
            let entry = self.ring.get(slot)?;
            let resident = entry.resident.as_ref()?;
            (resident.refcount == 0).then_some(EntryId {
                slot,
                epoch: entry.epoch,
            })
        })
    }

    // -----------------------------------------------------------------------
    // Reordering and eviction
    // -----------------------------------------------------------------------

    /// Marks an entry as most recently used.
    pub fn move_to_front(&mut self, id: EntryId) -> Result<(), RegexpError> {
        self.resident(id).ok_or_else(|| stale_handle(id))?;
        self.ring.move_to_front(id.slot);
        Ok(())
    }

    /// Empties an unpinned entry and moves its slot to the LRU end.
    pub fn evict(&mut self, id: EntryId) -> Result<(), RegexpError> {
        let resident = self.resident(id).ok_or_else(|| stale_handle(id))?;
        if resident.refcount > 0 {
            return Err(RegexpError::invalid_argument(format!(
                "cannot evict pinned cache entry ({id}, {} pins)",
                resident.refcount
            )));
        }
        self.evict_slot(id.slot);
        Ok(())
    }

    fn evict_slot(&mut self, slot: SlotId) {
        let Some(entry) = self.ring.get_mut(slot) else {
            return;
        };
        if let Some(old) = entry.clear() {
            debug_assert_eq!(old.refcount, 0);
            self.ring.move_to_back(slot);
            self.len -= 1;
            self.stats.record_eviction();
            debug!(
                slot = slot.index(),
                pattern_len = old.pattern.len(),
                "evicted cached pattern"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Pinning
    // -----------------------------------------------------------------------

    /// Pins an entry so it cannot be evicted until the returned [`Pin`] is
    /// released.
    pub fn acquire(&mut self, id: EntryId) -> Result<Pin, RegexpError> {
        let resident = self.resident_mut(id).ok_or_else(|| stale_handle(id))?;
        resident.refcount = resident.refcount.checked_add(1).ok_or_else(|| {
            RegexpError::OversizedResource {
                context: format!("pinning cache entry {id}"),
                message: "reference count overflow".into(),
            }
        })?;
        Ok(Pin::new(id))
    }

    /// Drops one pin. The last release moves the entry to the MRU end.
    pub fn release(&mut self, pin: Pin) {
        let id = pin.into_entry();
        let now_unpinned = match self.resident_mut(id) {
            Some(resident) if resident.refcount > 0 => {
                resident.refcount -= 1;
                Some(resident.refcount == 0)
            }
            _ => None,
        };
        match now_unpinned {
            Some(true) => {
                self.ring.move_to_front(id.slot);
            }
            Some(false) => {}
            None => warn!(entry = %id, "released a pin for an entry that is not pinned"),
        }
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Runs a resident matcher against `subject`.
    pub fn is_match(&mut self, id: EntryId, subject: &[u8]) -> Result<bool, RegexpError> {
        let Some(resident) = self
            .ring
            .get(id.slot)
            .and_then(|entry| entry.resident_at(id.epoch))
        else {
            return Err(stale_handle(id));
        };
        let scratch = if resident.jit_active {
            self.jit.scratch_mut()
        } else {
            None
        };
        self.engine
            .is_match(&resident.matcher, subject, scratch)
            .map_err(|err| match_error(&self.config, resident.pattern.as_bytes(), subject, err))
    }

    /// Runs a matcher that is not resident (see [`Resolved::Transient`]).
    pub fn is_match_compiled(
        &mut self,
        compiled: &Compiled<E::Matcher>,
        subject: &[u8],
    ) -> Result<bool, RegexpError> {
        let scratch = if compiled.jit_active {
            self.jit.scratch_mut()
        } else {
            None
        };
        self.engine
            .is_match(&compiled.matcher, subject, scratch)
            .map_err(|err| match_error(&self.config, compiled.pattern.as_bytes(), subject, err))
    }

    /// Looks up or compiles `pattern` and matches it against `subject`.
    ///
    /// The empty pattern matches everything and never touches the cache.
    ///
    /// # Example
    ///
    /// ```
    /// use regexkit::prelude::*;
    ///
    /// let mut cache = PatternCache::new(AutomataEngine::new());
    /// assert!(cache.matches(b"^ab+c$", CaseMode::Sensitive, b"abbbc").unwrap());
    /// assert!(cache.matches(b"^AB", CaseMode::Insensitive, b"abc").unwrap());
    /// assert!(!cache.matches(b"^AB", CaseMode::Sensitive, b"abc").unwrap());
    /// assert_eq!(cache.len(), 2);
    /// ```
    pub fn matches(
        &mut self,
        pattern: &[u8],
        case: CaseMode,
        subject: &[u8],
    ) -> Result<bool, RegexpError> {
        if pattern.is_empty() {
            return Ok(true);
        }
        match self.get_or_compile(pattern, case)? {
            Resolved::Resident(id) => self.is_match(id, subject),
            Resolved::Transient(compiled) => self.is_match_compiled(&compiled, subject),
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Returns a view of a resident entry, or `None` for a stale handle.
    pub fn entry(&self, id: EntryId) -> Option<EntryView<'_>> {
        self.resident(id).map(|r| view(id, r))
    }

    /// Returns the state of a slot regardless of epoch.
    pub fn slot_state(&self, slot: SlotId) -> Option<EntryState> {
        self.ring.get(slot).map(CacheEntry::state)
    }

    /// Iterates resident entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = EntryView<'_>> {
        self.ring.iter().map_while(|(slot, entry)| {
            entry.resident.as_ref().map(|r| {
                view(
                    EntryId {
                        slot,
                        epoch: entry.epoch,
                    },
                    r,
                )
            })
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns `true` once the shared JIT scratch exists.
    pub fn jit_initialized(&self) -> bool {
        self.jit.is_ready()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Releases the JIT scratch, then every matcher, then the cache.
    pub fn destroy(mut self) {
        let had_scratch = self.jit.release().is_some();
        let mut freed = 0usize;
        for entry in self.ring.values_mut() {
            if entry.clear().is_some() {
                freed += 1;
            }
        }
        self.len = 0;
        debug!(freed, had_scratch, "pattern cache destroyed");
    }

    // -----------------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------------

    /// Checks ring structure, the Active-prefix layout, the resident count,
    /// key uniqueness and JIT bookkeeping.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.ring.check_invariants()?;

        let mut seen_empty = false;
        let mut active = 0usize;
        let mut keys = FxHashSet::default();
        for (slot, entry) in self.ring.iter() {
            let Some(resident) = &entry.resident else {
                seen_empty = true;
                continue;
            };
            if seen_empty {
                return Err(InvariantError::new(format!(
                    "active slot {} follows an empty slot",
                    slot.index()
                )));
            }
            if !keys.insert(&resident.pattern) {
                return Err(InvariantError::new(format!(
                    "pattern {:?} is resident twice",
                    resident.pattern
                )));
            }
            if resident.jit_active && !self.jit.is_ready() {
                return Err(InvariantError::new(format!(
                    "slot {} is JIT-active without scratch",
                    slot.index()
                )));
            }
            active += 1;
        }
        if active != self.len {
            return Err(InvariantError::new(format!(
                "resident count {} does not match tracked len {}",
                active, self.len
            )));
        }
        if self.len > self.capacity() {
            return Err(InvariantError::new("len exceeds capacity"));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("pattern cache invariant violated: {err}");
        }
    }

    fn resident(&self, id: EntryId) -> Option<&Resident<E::Matcher>> {
        self.ring
            .get(id.slot)
            .and_then(|entry| entry.resident_at(id.epoch))
    }

    fn resident_mut(&mut self, id: EntryId) -> Option<&mut Resident<E::Matcher>> {
        self.ring
            .get_mut(id.slot)
            .and_then(|entry| entry.resident_at_mut(id.epoch))
    }
}

impl<E: RegexEngine> fmt::Debug for PatternCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternCache")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("jit_initialized", &self.jit.is_ready())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

fn view<M>(id: EntryId, resident: &Resident<M>) -> EntryView<'_> {
    EntryView {
        id,
        pattern: &resident.pattern,
        refcount: resident.refcount,
        jit_active: resident.jit_active,
    }
}

// ---------------------------------------------------------------------------
// Error translation
// ---------------------------------------------------------------------------

fn stale_handle(id: EntryId) -> RegexpError {
    RegexpError::invalid_argument(format!("cache entry {id} is no longer resident"))
}

fn compile_error(config: &CacheConfig, pattern: &[u8], err: EngineError) -> RegexpError {
    let shown = truncate_for_display(pattern, config.max_displayed_pattern_length);
    match err {
        EngineError::NoMemory => RegexpError::AllocationFailure,
        EngineError::Syntax { offset, message } => RegexpError::CompileSyntaxError {
            pattern: shown.into_owned(),
            offset,
            message,
        },
        err @ (EngineError::SizeLimit { .. } | EngineError::ScratchExhausted) => {
            RegexpError::OversizedResource {
                context: format!("error compiling pattern '{shown}'"),
                message: err.to_string(),
            }
        }
        EngineError::Internal { code, message } => RegexpError::EngineInternalError {
            context: format!("error compiling pattern '{shown}'"),
            code,
            message,
        },
    }
}

fn match_error(config: &CacheConfig, pattern: &[u8], subject: &[u8], err: EngineError) -> RegexpError {
    let max = config.max_displayed_pattern_length;
    let context = format!(
        "error matching regex: '{}' against subject: '{}'",
        truncate_for_display(pattern, max),
        truncate_for_display(subject, max),
    );
    match err {
        EngineError::NoMemory => RegexpError::AllocationFailure,
        err @ (EngineError::SizeLimit { .. } | EngineError::ScratchExhausted) => {
            RegexpError::OversizedResource {
                context,
                message: err.to_string(),
            }
        }
        err @ EngineError::Syntax { .. } => RegexpError::EngineInternalError {
            context,
            code: err.code(),
            message: err.to_string(),
        },
        EngineError::Internal { code, message } => RegexpError::EngineInternalError {
            context,
            code,
            message,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
