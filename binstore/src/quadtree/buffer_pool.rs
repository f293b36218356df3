//! Fixed pool of tile buffers shared by all leaves of a database.
//!
//! Every slot holds one tile-sized float array, the leaf that currently owns
//! it and the tick at which it was assigned. Slots are handed out oldest
//! assignment first. Accesses do not refresh a slot's tick, so the policy is
//! FIFO by assignment rather than LRU.

use super::qt_types::{ElementId, SlotId};

/// One reusable tile buffer
pub struct BufferSlot {
    pub data: Vec<f32>,
    pub owner: Option<ElementId>,
    pub timestamp: u64,
}

/// The pool itself. The caller is responsible for flushing and releasing a
/// previous owner before reassigning its slot.
pub struct BufferPool {
    slots: Vec<BufferSlot>,
    clock: u64,
}

impl BufferPool {
    /// Create `num_slots` zeroed buffers of `slot_len` floats each
    pub fn new(num_slots: usize, slot_len: usize) -> Self {
        let slots = (0..num_slots)
            .map(|_| BufferSlot {
                data: vec![0.0; slot_len],
                owner: None,
                timestamp: 0,
            })
            .collect();
        Self { slots, clock: 0 }
    }

    /// Slot with the oldest assignment; the lowest index wins ties.
    pub fn oldest(&self) -> SlotId {
        let mut oldest = 0;
        for (id, slot) in self.slots.iter().enumerate() {
            if slot.timestamp < self.slots[oldest].timestamp {
                oldest = id;
            }
        }
        oldest
    }

    pub fn owner(&self, slot: SlotId) -> Option<ElementId> {
        self.slots[slot].owner
    }

    /// Hand `slot` to `owner` and stamp it with a fresh tick
    pub fn assign(&mut self, slot: SlotId, owner: ElementId) {
        self.clock += 1;
        let entry = &mut self.slots[slot];
        entry.owner = Some(owner);
        entry.timestamp = self.clock;
    }

    /// Forget the owner of `slot`. Contents are left as they are.
    pub fn release(&mut self, slot: SlotId) -> Option<ElementId> {
        self.slots[slot].owner.take()
    }

    pub fn data(&self, slot: SlotId) -> &[f32] {
        &self.slots[slot].data
    }

    pub fn data_mut(&mut self, slot: SlotId) -> &mut [f32] {
        &mut self.slots[slot].data
    }

    /// Slots that currently have an owner, with that owner
    pub fn owned(&self) -> Vec<(SlotId, ElementId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.owner.map(|owner| (id, owner)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn resident(&self) -> usize {
        self.slots.iter().filter(|s| s.owner.is_some()).count()
    }
}
