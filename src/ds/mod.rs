pub mod slot_ring;

pub use slot_ring::{SlotId, SlotRing, SlotRingIds};
