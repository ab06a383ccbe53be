//! Cache slots and the handles that address them.

use std::fmt;

use crate::ds::SlotId;
use crate::pattern::Pattern;

/// Handle to a resident cache entry.
///
/// The epoch changes every time a slot is reused, so a handle kept across an
/// eviction stops resolving instead of silently naming a different pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub(crate) slot: SlotId,
    pub(crate) epoch: u64,
}

impl EntryId {
    #[inline]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}@{}", self.slot.index(), self.epoch)
    }
}

/// Lifecycle state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Active { refcount: u32 },
}

/// A freshly compiled pattern that has not (yet) been placed in a slot.
///
/// Returned by [`PatternCache::compile`](crate::cache::PatternCache::compile)
/// and handed back by `insert_or_evict` when every slot is pinned.
#[derive(Debug)]
pub struct Compiled<M> {
    pub(crate) pattern: Pattern,
    pub(crate) matcher: M,
    pub(crate) jit_active: bool,
}

impl<M> Compiled<M> {
    #[inline]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[inline]
    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    #[inline]
    pub fn jit_active(&self) -> bool {
        self.jit_active
    }
}

#[derive(Debug)]
pub(crate) struct Resident<M> {
    pub(crate) pattern: Pattern,
    pub(crate) matcher: M,
    pub(crate) refcount: u32,
    pub(crate) jit_active: bool,
}

/// One slot of the ring. `resident` is `None` while the slot is Empty.
#[derive(Debug)]
pub(crate) struct CacheEntry<M> {
    pub(crate) resident: Option<Resident<M>>,
    pub(crate) epoch: u64,
}

impl<M> CacheEntry<M> {
    pub(crate) fn empty() -> Self {
        Self {
            resident: None,
            epoch: 0,
        }
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.resident.is_some()
    }

    pub(crate) fn state(&self) -> EntryState {
        match &self.resident {
            Some(r) => EntryState::Active {
                refcount: r.refcount,
            },
            None => EntryState::Empty,
        }
    }

    /// Fills an Empty slot. The caller supplies a fresh epoch.
    pub(crate) fn activate(&mut self, compiled: Compiled<M>, epoch: u64) {
        debug_assert!(self.resident.is_none());
        self.resident = Some(Resident {
            pattern: compiled.pattern,
            matcher: compiled.matcher,
            refcount: 0,
            jit_active: compiled.jit_active,
        });
        self.epoch = epoch;
    }

    /// Empties the slot, returning what it held.
    pub(crate) fn clear(&mut self) -> Option<Resident<M>> {
        self.resident.take()
    }

    /// Returns the resident data when `epoch` still names this activation.
    #[inline]
    pub(crate) fn resident_at(&self, epoch: u64) -> Option<&Resident<M>> {
        self.resident.as_ref().filter(|_| self.epoch == epoch)
    }

    #[inline]
    pub(crate) fn resident_at_mut(&mut self, epoch: u64) -> Option<&mut Resident<M>> {
        if self.epoch != epoch {
            return None;
        }
        self.resident.as_mut()
    }
}

/// Read-only view of a resident entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryView<'a> {
    pub(crate) id: EntryId,
    pub(crate) pattern: &'a Pattern,
    pub(crate) refcount: u32,
    pub(crate) jit_active: bool,
}

impl<'a> EntryView<'a> {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn pattern(&self) -> &'a Pattern {
        self.pattern
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn is_pinned(&self) -> bool {
        self.refcount > 0
    }

    pub fn jit_active(&self) -> bool {
        self.jit_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::CaseMode;

    fn compiled(text: &[u8]) -> Compiled<u32> {
        Compiled {
            pattern: Pattern::new(text, CaseMode::Sensitive),
            matcher: 7,
            jit_active: true,
        }
    }

    #[test]
    fn entry_lifecycle_empty_active_empty() {
        let mut entry = CacheEntry::<u32>::empty();
        assert_eq!(entry.state(), EntryState::Empty);

        entry.activate(compiled(b"abc"), 3);
        assert_eq!(entry.state(), EntryState::Active { refcount: 0 });
        assert!(entry.resident_at(3).is_some());
        assert!(entry.resident_at(2).is_none());

        entry.resident_at_mut(3).unwrap().refcount += 1;
        assert_eq!(entry.state(), EntryState::Active { refcount: 1 });

        let old = entry.clear().unwrap();
        assert_eq!(old.pattern.as_bytes(), b"abc");
        assert_eq!(entry.state(), EntryState::Empty);
        assert!(entry.resident_at(3).is_none());
    }

    #[test]
    fn entry_id_display() {
        let id = EntryId {
            slot: SlotId(4),
            epoch: 9,
        };
        assert_eq!(id.to_string(), "slot 4@9");
    }
}
