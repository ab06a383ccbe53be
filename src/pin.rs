//! Pins and leases: keeping a compiled matcher alive beyond one lookup.
//!
//! A [`Pin`] is a linear token: it cannot be cloned or copied and
//! [`PatternCache::release`] consumes it, so each acquire is released at most
//! once. Dropping a `Pin` without releasing it leaves the entry pinned.
//!
//! A [`Lease`] owns a pin together with a handle to its cache and releases
//! it on drop. It is the value a host stores in a per-call auxiliary slot so
//! repeated calls with the same pattern skip the lookup entirely.
//!
//! ```text
//!   Lease::acquire ──► get_or_compile ──► Resident(id) ──► acquire ──► Held::Pinned(pin)
//!                                    └──► Transient(compiled) ───────► Held::Transient
//!   drop(Lease)    ──► release(pin)  (transient matcher is simply dropped)
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::cache::{PatternCache, Resolved};
use crate::engine::RegexEngine;
use crate::entry::{Compiled, EntryId};
use crate::error::RegexpError;
use crate::pattern::{CaseMode, Pattern};

/// Proof that an entry's reference count was incremented.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pin keeps its entry resident until passed to `release`"]
pub struct Pin {
    id: EntryId,
}

impl Pin {
    pub(crate) fn new(id: EntryId) -> Self {
        Self { id }
    }

    /// The pinned entry.
    #[inline]
    pub fn entry(&self) -> EntryId {
        self.id
    }

    pub(crate) fn into_entry(self) -> EntryId {
        self.id
    }
}

/// What a lease holds on to.
#[derive(Debug)]
pub(crate) enum Held<M> {
    /// The empty pattern: matches everything, nothing cached.
    MatchAll,
    Pinned(Option<Pin>),
    /// Every slot was pinned at acquire time.
    Transient(Compiled<M>),
}

impl<M> Held<M> {
    /// Resolves a pattern against `cache` and pins the result.
    pub(crate) fn resolve<E>(
        cache: &mut PatternCache<E>,
        pattern: &[u8],
        case: CaseMode,
    ) -> Result<Self, RegexpError>
    where
        E: RegexEngine<Matcher = M>,
    {
        if pattern.is_empty() {
            return Ok(Held::MatchAll);
        }
        Ok(match cache.get_or_compile(pattern, case)? {
            Resolved::Resident(id) => Held::Pinned(Some(cache.acquire(id)?)),
            Resolved::Transient(compiled) => Held::Transient(compiled),
        })
    }

    pub(crate) fn is_match<E>(
        &self,
        cache: &mut PatternCache<E>,
        subject: &[u8],
    ) -> Result<bool, RegexpError>
    where
        E: RegexEngine<Matcher = M>,
    {
        match self {
            Held::MatchAll => Ok(true),
            Held::Pinned(Some(pin)) => cache.is_match(pin.entry(), subject),
            Held::Pinned(None) => Err(RegexpError::invalid_argument("lease already released")),
            Held::Transient(compiled) => cache.is_match_compiled(compiled, subject),
        }
    }

    pub(crate) fn take_pin(&mut self) -> Option<Pin> {
        match self {
            Held::Pinned(pin) => pin.take(),
            _ => None,
        }
    }

    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, Held::Transient(_))
    }
}

/// A pinned pattern bound to a per-context cache; released on drop.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use regexkit::prelude::*;
///
/// let cache = Rc::new(RefCell::new(PatternCache::new(AutomataEngine::new())));
/// let lease = Lease::acquire(&cache, b"^[a-z]+$", CaseMode::Sensitive).unwrap();
/// assert!(lease.is_match(b"hello").unwrap());
/// assert!(!lease.is_match(b"Hello").unwrap());
/// assert_eq!(cache.borrow().iter().next().unwrap().refcount(), 1);
///
/// drop(lease);
/// assert_eq!(cache.borrow().iter().next().unwrap().refcount(), 0);
/// ```
pub struct Lease<E: RegexEngine> {
    cache: Rc<RefCell<PatternCache<E>>>,
    pattern: Pattern,
    held: Held<E::Matcher>,
}

impl<E: RegexEngine> Lease<E> {
    /// Looks up or compiles `pattern` and pins it.
    pub fn acquire(
        cache: &Rc<RefCell<PatternCache<E>>>,
        pattern: &[u8],
        case: CaseMode,
    ) -> Result<Self, RegexpError> {
        let held = {
            let mut guard = cache
                .try_borrow_mut()
                .map_err(|_| RegexpError::invalid_argument("pattern cache is already in use"))?;
            Held::resolve(&mut *guard, pattern, case)?
        };
        Ok(Self {
            cache: Rc::clone(cache),
            pattern: Pattern::new(pattern, case),
            held,
        })
    }

    pub fn is_match(&self, subject: &[u8]) -> Result<bool, RegexpError> {
        let mut guard = self
            .cache
            .try_borrow_mut()
            .map_err(|_| RegexpError::invalid_argument("pattern cache is already in use"))?;
        self.held.is_match(&mut *guard, subject)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns `true` when this lease holds `pattern` in `case` mode.
    pub fn holds(&self, pattern: &[u8], case: CaseMode) -> bool {
        self.pattern.case() == case && self.pattern.as_bytes() == pattern
    }

    /// The pinned entry, or `None` for empty or transient patterns.
    pub fn entry(&self) -> Option<EntryId> {
        match &self.held {
            Held::Pinned(Some(pin)) => Some(pin.entry()),
            _ => None,
        }
    }

    /// Returns `true` when the matcher was not cached because every slot was
    /// pinned.
    pub fn is_transient(&self) -> bool {
        self.held.is_transient()
    }
}

impl<E: RegexEngine> Drop for Lease<E> {
    fn drop(&mut self) {
        let Some(pin) = self.held.take_pin() else {
            return;
        };
        match self.cache.try_borrow_mut() {
            Ok(mut cache) => cache.release(pin),
            Err(_) => warn!(
                entry = %pin.entry(),
                "pattern cache busy while dropping lease, entry stays pinned"
            ),
        }
    }
}

impl<E: RegexEngine> std::fmt::Debug for Lease<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("pattern", &self.pattern)
            .field("entry", &self.entry())
            .field("transient", &self.is_transient())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CacheBuilder;
    use crate::engine::scripted::ScriptedEngine;

    fn shared(capacity: usize) -> Rc<RefCell<PatternCache<ScriptedEngine>>> {
        Rc::new(RefCell::new(
            CacheBuilder::new(capacity)
                .try_build(ScriptedEngine::default())
                .unwrap(),
        ))
    }

    #[test]
    fn lease_pins_until_dropped() {
        let cache = shared(2);
        let lease = Lease::acquire(&cache, b"abc", CaseMode::Sensitive).unwrap();
        let id = lease.entry().unwrap();
        assert_eq!(cache.borrow().entry(id).unwrap().refcount(), 1);
        assert!(lease.is_match(b"xabcx").unwrap());

        // Pressure on the other slot never touches the pinned entry.
        for p in ["d", "e", "f"] {
            assert!(cache
                .borrow_mut()
                .matches(p.as_bytes(), CaseMode::Sensitive, p.as_bytes())
                .unwrap());
        }
        assert!(cache.borrow().entry(id).is_some());

        drop(lease);
        assert_eq!(cache.borrow().entry(id).unwrap().refcount(), 0);
        cache.borrow().debug_validate_invariants();
    }

    #[test]
    fn two_leases_on_one_pattern_share_the_entry() {
        let cache = shared(2);
        let a = Lease::acquire(&cache, b"abc", CaseMode::Sensitive).unwrap();
        let b = Lease::acquire(&cache, b"abc", CaseMode::Sensitive).unwrap();
        assert_eq!(a.entry(), b.entry());
        let id = a.entry().unwrap();
        assert_eq!(cache.borrow().entry(id).unwrap().refcount(), 2);
        drop(a);
        assert_eq!(cache.borrow().entry(id).unwrap().refcount(), 1);
        drop(b);
        assert_eq!(cache.borrow().entry(id).unwrap().refcount(), 0);
    }

    #[test]
    fn lease_falls_back_to_transient_when_all_pinned() {
        let cache = shared(1);
        let first = Lease::acquire(&cache, b"abc", CaseMode::Sensitive).unwrap();
        let second = Lease::acquire(&cache, b"xyz", CaseMode::Sensitive).unwrap();
        assert!(!first.is_transient());
        assert!(second.is_transient());
        assert_eq!(second.entry(), None);
        assert!(second.is_match(b"_xyz_").unwrap());
        assert_eq!(cache.borrow().len(), 1);
        drop(second);
        drop(first);
        cache.borrow().debug_validate_invariants();
    }

    #[test]
    fn empty_pattern_lease_matches_everything() {
        let cache = shared(1);
        let lease = Lease::acquire(&cache, b"", CaseMode::Insensitive).unwrap();
        assert!(lease.is_match(b"").unwrap());
        assert!(lease.is_match(b"anything").unwrap());
        assert!(cache.borrow().is_empty());
        assert!(lease.holds(b"", CaseMode::Insensitive));
        assert!(!lease.holds(b"", CaseMode::Sensitive));
    }

    #[test]
    fn failed_compile_leaves_no_lease() {
        let cache = shared(1);
        assert!(Lease::acquire(&cache, b"!x", CaseMode::Sensitive).is_err());
        assert!(cache.borrow().is_empty());
    }

    #[test]
    fn lease_dropped_while_cache_busy_leaks_its_pin() {
        let cache = shared(2);
        let lease = Lease::acquire(&cache, b"abc", CaseMode::Sensitive).unwrap();
        let id = lease.entry().unwrap();
        {
            let _busy = cache.borrow_mut();
            drop(lease);
        }

        let mut guard = cache.borrow_mut();
        assert_eq!(guard.entry(id).unwrap().refcount(), 1);
        assert!(guard.check_invariants().is_ok());
        assert!(guard.evict(id).is_err());

        // The leaked entry keeps its slot for good; the other slot churns.
        for p in ["d", "e", "f", "g"] {
            assert!(guard
                .matches(p.as_bytes(), CaseMode::Sensitive, p.as_bytes())
                .unwrap());
            assert!(guard.entry(id).is_some());
        }
        assert!(guard.check_invariants().is_ok());
    }

    #[test]
    fn busy_cache_is_reported_not_panicked() {
        let cache = shared(1);
        let lease = Lease::acquire(&cache, b"a", CaseMode::Sensitive).unwrap();
        let _guard = cache.borrow_mut();
        assert!(matches!(
            lease.is_match(b"a"),
            Err(RegexpError::InvalidArgument(_))
        ));
    }
}
