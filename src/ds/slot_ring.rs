//! Fixed-capacity cyclic doubly linked list with a sentinel root.
//!
//! Every slot is allocated up front and lives for the lifetime of the ring;
//! only its *position* changes. Links are plain indices into a `Vec`, so
//! relinking is O(1) without raw pointers or self-referential structs.
//!
//! ## Architecture
//!
//! ```text
//!   links (Vec<Link>)            slots (Vec<T>)
//!   ┌───────┬──────────────┐     ┌────────┬───────┐
//!   │ index │ prev / next  │     │ SlotId │ value │
//!   ├───────┼──────────────┤     ├────────┼───────┤
//!   │ 0     │ root         │     │        │       │
//!   │ 1     │ slot 0       │ ──► │ 0      │ A     │
//!   │ 2     │ slot 1       │ ──► │ 1      │ B     │
//!   │ 3     │ slot 2       │ ──► │ 2      │ C     │
//!   └───────┴──────────────┘     └────────┴───────┘
//!
//!        ┌──────────────────────────────────────────┐
//!        ▼                                          │
//!      root ──► [A] ◄──► [B] ◄──► [C] ──────────────┘
//!              front                back
//!              (MRU)                (LRU)
//! ```
//!
//! ## Operations
//! - `move_to_front(id)`: unlink + relink after root
//! - `move_to_back(id)`: unlink + relink before root
//! - `iter_ids()` / `iter_ids_rev()`: walk from either end
//!
//! All reorder operations are O(1); iteration is O(capacity).
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use crate::error::InvariantError;

const ROOT: usize = 0;

/// Stable handle to one slot of a [`SlotRing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// Returns the slot index in `0..capacity`.
    pub fn index(self) -> usize {
        self.0
    }

    #[inline]
    fn link(self) -> usize {
        self.0 + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: usize,
    next: usize,
}

/// Cyclic list of a fixed number of slots, linked through a sentinel root.
#[derive(Debug)]
pub struct SlotRing<T> {
    links: Vec<Link>,
    slots: Vec<T>,
}

impl<T> SlotRing<T> {
    /// Creates a ring of `capacity` slots, each initialized by `init`.
    ///
    /// Slots start in index order: slot 0 at the front, slot `capacity - 1`
    /// at the back.
    pub fn from_fn(capacity: usize, mut init: impl FnMut(SlotId) -> T) -> Self {
        let mut links = Vec::with_capacity(capacity + 1);
        let mut slots = Vec::with_capacity(capacity);
        links.push(Link {
            prev: capacity,
            next: if capacity == 0 { ROOT } else { 1 },
        });
        for idx in 0..capacity {
            let link = idx + 1;
            links.push(Link {
                prev: link - 1,
                next: if idx + 1 == capacity { ROOT } else { link + 1 },
            });
            slots.push(init(SlotId(idx)));
        }
        Self { links, slots }
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the slot value for `id`, if `id` is in range.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0)
    }

    /// Returns a mutable reference to the slot value for `id`.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0)
    }

    /// Returns the SlotId at the front (MRU) of the ring.
    pub fn front_id(&self) -> Option<SlotId> {
        self.id_at(self.links[ROOT].next)
    }

    /// Returns the SlotId at the back (LRU) of the ring.
    pub fn back_id(&self) -> Option<SlotId> {
        self.id_at(self.links[ROOT].prev)
    }

    /// Returns the slot that follows `id` towards the back, if any.
    pub fn next_id(&self, id: SlotId) -> Option<SlotId> {
        self.links.get(id.link()).and_then(|l| self.id_at(l.next))
    }

    /// Returns the slot that precedes `id` towards the front, if any.
    pub fn prev_id(&self, id: SlotId) -> Option<SlotId> {
        self.links.get(id.link()).and_then(|l| self.id_at(l.prev))
    }

    /// Moves a slot to the front; returns `false` if `id` is out of range.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if id.0 >= self.slots.len() {
            return false;
        }
        if self.links[ROOT].next == id.link() {
            return true;
        }
        self.detach(id.link());
        self.attach_after(id.link(), ROOT);
        true
    }

    /// Moves a slot to the back; returns `false` if `id` is out of range.
    pub fn move_to_back(&mut self, id: SlotId) -> bool {
        if id.0 >= self.slots.len() {
            return false;
        }
        if self.links[ROOT].prev == id.link() {
            return true;
        }
        self.detach(id.link());
        let last = self.links[ROOT].prev;
        self.attach_after(id.link(), last);
        true
    }

    /// Returns an iterator of SlotIds from front to back.
    pub fn iter_ids(&self) -> SlotRingIds<'_, T> {
        SlotRingIds {
            ring: self,
            current: self.links[ROOT].next,
            forward: true,
        }
    }

    /// Returns an iterator of SlotIds from back to front.
    pub fn iter_ids_rev(&self) -> SlotRingIds<'_, T> {
        SlotRingIds {
            ring: self,
            current: self.links[ROOT].prev,
            forward: false,
        }
    }

    /// Returns an iterator of `(SlotId, &T)` from front to back.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.iter_ids().map(move |id| (id, &self.slots[id.0]))
    }

    /// Returns an iterator over every slot value in index order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }

    #[inline]
    fn id_at(&self, link: usize) -> Option<SlotId> {
        if link == ROOT {
            None
        } else {
            Some(SlotId(link - 1))
        }
    }

    fn detach(&mut self, link: usize) {
        let Link { prev, next } = self.links[link];
        self.links[prev].next = next;
        self.links[next].prev = prev;
        self.links[link] = Link {
            prev: link,
            next: link,
        };
    }

    fn attach_after(&mut self, link: usize, at: usize) {
        let next = self.links[at].next;
        self.links[link] = Link { prev: at, next };
        self.links[at].next = link;
        self.links[next].prev = link;
    }

    /// Checks that the ring is one cycle through the root visiting every
    /// slot exactly once with consistent back links.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut seen = vec![false; self.links.len()];
        let mut current = ROOT;
        for step in 0..self.links.len() {
            let Link { next, .. } = self.links[current];
            if next >= self.links.len() {
                return Err(InvariantError::new(format!(
                    "link {current} points outside the ring ({next})"
                )));
            }
            if self.links[next].prev != current {
                return Err(InvariantError::new(format!(
                    "back link of {next} does not point to {current}"
                )));
            }
            if seen[next] {
                return Err(InvariantError::new(format!(
                    "link {next} visited twice after {step} steps"
                )));
            }
            seen[next] = true;
            current = next;
        }
        if current != ROOT {
            return Err(InvariantError::new("ring does not close on the root"));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("slot ring invariant violated: {err}");
        }
    }

    #[cfg(any(test, debug_assertions))]
    /// Returns the ring order as slot indices from front to back.
    pub fn debug_snapshot_indices(&self) -> Vec<usize> {
        self.iter_ids().map(SlotId::index).collect()
    }
}

/// Iterator over SlotIds in either direction.
pub struct SlotRingIds<'a, T> {
    ring: &'a SlotRing<T>,
    current: usize,
    forward: bool,
}

impl<T> Iterator for SlotRingIds<'_, T> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ring.id_at(self.current)?;
        let link = self.ring.links[self.current];
        self.current = if self.forward { link.next } else { link.prev };
        Some(id)
    }
}
