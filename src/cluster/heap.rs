//! Indexed binary max-heap over per-community best merge gains

use std::collections::HashMap;

use super::community::CommunityId;

/// One heap entry: a community keyed by the delta Q of its best merge candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapEntry {
    pub delta_q: f64,
    pub community: CommunityId,
}

impl HeapEntry {
    /// Heap order: larger delta Q first, equal gains broken by smaller community id
    fn beats(&self, other: &HeapEntry) -> bool {
        self.delta_q > other.delta_q
            || (self.delta_q == other.delta_q && self.community < other.community)
    }
}

/// Binary max-heap that also tracks the slot of every community, so an
/// arbitrary entry can be removed or re-keyed in O(log n)
#[derive(Debug, Default)]
pub struct GainHeap {
    entries: Vec<HeapEntry>,
    slots: HashMap<CommunityId, usize>,
}

impl GainHeap {
    /// Create a heap with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry with the highest gain, without removing it
    pub fn peek(&self) -> Option<HeapEntry> {
        self.entries.first().copied()
    }

    /// Insert a community that is not yet present
    pub fn push(&mut self, community: CommunityId, delta_q: f64) {
        debug_assert!(!self.slots.contains_key(&community));

        let idx = self.entries.len();
        self.entries.push(HeapEntry { delta_q, community });
        self.slots.insert(community, idx);
        self.sift_up(idx);
    }

    /// Remove and return the entry with the highest gain
    pub fn pop(&mut self) -> Option<HeapEntry> {
        let entry = self.peek()?;
        self.remove(entry.community)
    }

    /// Remove the entry of a specific community, wherever it sits
    pub fn remove(&mut self, community: CommunityId) -> Option<HeapEntry> {
        let slot = *self.slots.get(&community)?;
        let last = self.entries.len() - 1;

        self.entries.swap(slot, last);
        let entry = self
            .entries
            .pop()
            .expect("slot map referenced an empty heap");
        self.slots.remove(&community);

        // Re-seat the element that was moved into the vacated slot
        if slot < self.entries.len() {
            self.slots.insert(self.entries[slot].community, slot);
            self.resift(slot);
        }

        Some(entry)
    }

    /// Re-key an existing entry and restore heap order
    pub fn update(&mut self, community: CommunityId, delta_q: f64) {
        let slot = *self
            .slots
            .get(&community)
            .expect("update target missing from gain heap");
        self.entries[slot].delta_q = delta_q;
        self.resift(slot);
    }

    /// Move the entry at `idx` up or down until heap order holds again
    fn resift(&mut self, idx: usize) {
        if idx > 0 && self.entries[idx].beats(&self.entries[(idx - 1) / 2]) {
            self.sift_up(idx);
        } else {
            self.sift_down(idx);
        }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.entries[idx].beats(&self.entries[parent]) {
                break;
            }
            self.swap_entries(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut best = idx;

            if left < self.entries.len() && self.entries[left].beats(&self.entries[best]) {
                best = left;
            }
            if right < self.entries.len() && self.entries[right].beats(&self.entries[best]) {
                best = right;
            }
            if best == idx {
                break;
            }
            self.swap_entries(idx, best);
            idx = best;
        }
    }

    fn swap_entries(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.slots.insert(self.entries[a].community, a);
        self.slots.insert(self.entries[b].community, b);
    }
}
