// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-capacity event queue
//!
//! A binary min-heap over event kinds. The heap is stored as a permutation of
//! kind indices (`order`) whose first `count` entries form the live heap; the
//! inverse permutation (`position`) gives O(1) lookup of any kind's heap slot
//! so that arbitrary removal costs O(log n).
//!
//! Events are stored in a per-kind slot table, so the queue never allocates
//! after construction.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::{Event, EventKind, Timestamp};
use crate::core::error::SaveStateError;

/// A pending event together with its insertion sequence number
#[derive(Debug, Clone, Copy)]
struct Slot<K> {
    event: Event<K>,
    seq: u64,
}

/// Heap ordering key: due time first, insertion order second
type Key = (Timestamp, u64);

/// Binary min-heap of pending events, one slot per event kind
#[derive(Debug, Clone)]
pub struct EventQueue<K: EventKind> {
    /// Pending event per kind, indexed by `EventKind::index`
    slots: Vec<Option<Slot<K>>>,

    /// Heap permutation of kind indices; `order[..count]` is the live heap
    order: Vec<usize>,

    /// Inverse of `order`: heap position of each kind
    position: Vec<usize>,

    /// Number of live events
    count: usize,

    /// Sequence number handed to the next inserted event
    next_seq: u64,
}

impl<K: EventKind> EventQueue<K> {
    /// Create an empty queue sized for every kind of `K`
    pub fn new() -> Self {
        let capacity = K::COUNT;
        Self {
            slots: vec![None; capacity],
            order: (0..capacity).collect(),
            position: (0..capacity).collect(),
            count: 0,
            next_seq: 0,
        }
    }

    /// Maximum number of simultaneously pending events
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of pending events
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether an event of `kind` is pending
    #[inline]
    pub fn is_active(&self, kind: K) -> bool {
        self.position[self.slot_index(kind)] < self.count
    }

    /// The pending event of `kind`, if any
    #[inline]
    pub fn get(&self, kind: K) -> Option<&Event<K>> {
        self.slots[self.slot_index(kind)]
            .as_ref()
            .map(|slot| &slot.event)
    }

    /// The event that fires next, without removing it
    #[inline]
    pub fn peek(&self) -> Option<&Event<K>> {
        if self.count == 0 {
            return None;
        }
        self.slots[self.order[0]].as_ref().map(|slot| &slot.event)
    }

    /// Iterate over pending events in heap order
    pub fn iter(&self) -> impl Iterator<Item = &Event<K>> + '_ {
        self.order[..self.count]
            .iter()
            .filter_map(move |&index| self.slots[index].as_ref().map(|slot| &slot.event))
    }

    /// Push an event onto the heap
    ///
    /// Zero-duration events are ignored and `false` is returned.
    ///
    /// # Panics
    ///
    /// Panics if an event of the same kind is already pending or the queue is
    /// full. Both mean the owning machine lost track of its own events.
    pub fn insert(&mut self, event: Event<K>) -> bool {
        debug_assert!(event.start <= event.due, "event {event} ends before it starts");

        if event.start == event.due {
            log::trace!("Timing: ignoring zero-duration {} event", event.kind.name());
            return false;
        }

        let index = self.slot_index(event.kind);
        assert!(
            !self.is_active(event.kind),
            "event queue: {} is already pending",
            event.kind.name()
        );
        assert!(
            self.count < self.capacity(),
            "event queue overflow: {} of {} slots in use",
            self.count,
            self.capacity()
        );

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.slots[index] = Some(Slot { event, seq });

        let pos = self.count;
        self.swap(self.position[index], pos);
        self.count += 1;
        self.sift_up(pos);

        self.self_check();
        true
    }

    /// Remove and return the earliest event
    pub fn pop(&mut self) -> Option<Event<K>> {
        if self.count == 0 {
            return None;
        }

        let index = self.order[0];
        let last = self.count - 1;
        self.swap(0, last);
        self.count = last;
        let slot = self.slots[index].take();

        if self.count > 0 {
            self.sift_down(0);
        }

        self.self_check();
        slot.map(|slot| slot.event)
    }

    /// Remove the pending event of `kind`, if any
    pub fn remove(&mut self, kind: K) -> Option<Event<K>> {
        let index = self.slot_index(kind);
        let pos = self.position[index];
        if pos >= self.count {
            return None;
        }

        let last = self.count - 1;
        self.swap(pos, last);
        self.count = last;
        let slot = self.slots[index].take();

        if pos < self.count {
            // The former last element now sits at `pos` and may belong either
            // above or below it.
            if pos > 0 && self.key(pos) < self.key((pos - 1) / 2) {
                self.sift_up(pos);
            } else {
                self.sift_down(pos);
            }
        }

        self.self_check();
        slot.map(|slot| slot.event)
    }

    /// Subtract `offset` from every pending event's start and due times
    ///
    /// Relative order is unchanged, so the heap needs no repair.
    pub fn rebase(&mut self, offset: Timestamp) {
        for &index in &self.order[..self.count] {
            if let Some(slot) = self.slots[index].as_mut() {
                slot.event.start -= offset;
                slot.event.due -= offset;
            }
        }
        self.self_check();
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.count = 0;
        self.next_seq = 0;
    }

    /// Check the heap order and the kind/position tables
    pub fn verify(&self) -> Result<(), String> {
        let capacity = self.capacity();
        if self.order.len() != capacity || self.position.len() != capacity {
            return Err(format!(
                "table sizes {}/{} do not match capacity {}",
                self.order.len(),
                self.position.len(),
                capacity
            ));
        }
        if self.count > capacity {
            return Err(format!("count {} exceeds capacity {}", self.count, capacity));
        }

        for (pos, &index) in self.order.iter().enumerate() {
            if index >= capacity || self.position[index] != pos {
                return Err(format!("heap position {pos} and kind {index} disagree"));
            }

            match (&self.slots[index], pos < self.count) {
                (Some(slot), true) => {
                    if slot.event.kind.index() != index {
                        return Err(format!(
                            "slot {index} holds a {} event",
                            slot.event.kind.name()
                        ));
                    }
                    if slot.event.start > slot.event.due {
                        return Err(format!("event {} ends before it starts", slot.event));
                    }
                }
                (None, false) => {}
                (Some(_), false) => {
                    return Err(format!("inactive kind {index} still holds an event"))
                }
                (None, true) => return Err(format!("live heap position {pos} is empty")),
            }
        }

        for pos in 1..self.count {
            let parent = (pos - 1) / 2;
            if self.key(parent) > self.key(pos) {
                return Err(format!(
                    "heap order violated between positions {parent} and {pos}"
                ));
            }
        }

        Ok(())
    }

    /// Snapshot the queue for a save state
    pub fn to_state(&self) -> QueueState {
        let index = self
            .position
            .iter()
            .map(|&pos| (pos < self.count).then_some(pos as u32))
            .collect();

        let slots = self
            .slots
            .iter()
            .map(|slot| {
                slot.as_ref().map(|slot| EventRecord {
                    kind: slot.event.kind.index() as u32,
                    start: slot.event.start,
                    due: slot.event.due,
                    seq: slot.seq,
                })
            })
            .collect();

        QueueState {
            index,
            slots,
            order: self.order.iter().map(|&index| index as u32).collect(),
            count: self.count as u32,
            next_seq: self.next_seq,
        }
    }

    /// Rebuild a queue from a save state, rejecting inconsistent data
    pub fn from_state(state: &QueueState) -> Result<Self, SaveStateError> {
        let capacity = K::COUNT;

        if state.index.len() != capacity
            || state.slots.len() != capacity
            || state.order.len() != capacity
        {
            return Err(SaveStateError::scheduler(format!(
                "table sizes {}/{}/{} do not match the {} declared event kinds",
                state.index.len(),
                state.slots.len(),
                state.order.len(),
                capacity
            )));
        }

        let count = state.count as usize;
        if count > capacity {
            return Err(SaveStateError::scheduler(format!(
                "live count {count} exceeds capacity {capacity}"
            )));
        }

        let mut position = vec![usize::MAX; capacity];
        for (pos, &index) in state.order.iter().enumerate() {
            let index = index as usize;
            if index >= capacity {
                return Err(SaveStateError::scheduler(format!(
                    "heap position {pos} addresses kind {index}, only {capacity} declared"
                )));
            }
            if position[index] != usize::MAX {
                return Err(SaveStateError::scheduler(format!(
                    "kind {index} appears twice in the heap order"
                )));
            }
            position[index] = pos;
        }

        for (index, entry) in state.index.iter().enumerate() {
            if let Some(pos) = *entry {
                if pos as usize >= count {
                    return Err(SaveStateError::scheduler(format!(
                        "kind {index} indexes position {pos}, live count is {count}"
                    )));
                }
            }
            let expected = (position[index] < count).then_some(position[index] as u32);
            if *entry != expected {
                return Err(SaveStateError::scheduler(format!(
                    "index entry for kind {index} disagrees with the heap order"
                )));
            }
        }

        let mut slots = Vec::with_capacity(capacity);
        for (index, record) in state.slots.iter().enumerate() {
            let active = position[index] < count;
            let slot = match (record, active) {
                (Some(record), true) => {
                    let kind = K::from_index(record.kind as usize)
                        .filter(|kind| kind.index() == index)
                        .ok_or_else(|| {
                            SaveStateError::scheduler(format!(
                                "slot {index} records kind {}",
                                record.kind
                            ))
                        })?;
                    if record.start > record.due {
                        return Err(SaveStateError::scheduler(format!(
                            "{} event ends before it starts",
                            kind.name()
                        )));
                    }
                    if record.seq >= state.next_seq {
                        return Err(SaveStateError::scheduler(format!(
                            "{} event carries a sequence number from the future",
                            kind.name()
                        )));
                    }
                    Some(Slot {
                        event: Event {
                            kind,
                            start: record.start,
                            due: record.due,
                        },
                        seq: record.seq,
                    })
                }
                (None, false) => None,
                (Some(_), false) => {
                    return Err(SaveStateError::scheduler(format!(
                        "inactive kind {index} carries an event"
                    )))
                }
                (None, true) => {
                    return Err(SaveStateError::scheduler(format!(
                        "active kind {index} has no event"
                    )))
                }
            };
            slots.push(slot);
        }

        let queue = Self {
            slots,
            order: state.order.iter().map(|&index| index as usize).collect(),
            position,
            count,
            next_seq: state.next_seq,
        };
        queue.verify().map_err(SaveStateError::scheduler)?;
        Ok(queue)
    }

    /// Validated slot index of `kind`
    #[inline]
    fn slot_index(&self, kind: K) -> usize {
        let index = kind.index();
        assert!(
            index < self.capacity(),
            "event kind {kind:?} outside the declared range of {} kinds",
            self.capacity()
        );
        index
    }

    #[inline]
    fn key(&self, pos: usize) -> Key {
        match &self.slots[self.order[pos]] {
            Some(slot) => (slot.event.due, slot.seq),
            None => unreachable!("live heap position {pos} has no event"),
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
        self.position[self.order[a]] = a;
        self.position[self.order[b]] = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.key(pos) >= self.key(parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;

            if left < self.count && self.key(left) < self.key(smallest) {
                smallest = left;
            }
            if right < self.count && self.key(right) < self.key(smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }

            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    /// Debug-build invariant check run after every mutation
    #[inline]
    fn self_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(reason) = self.verify() {
                panic!("event queue invariant violated: {reason}");
            }
        }
    }
}

impl<K: EventKind> Default for EventQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted form of one pending event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct EventRecord {
    /// Kind index
    pub kind: u32,

    pub start: u64,

    pub due: u64,

    /// Insertion sequence number (tie-break among equal due times)
    pub seq: u64,
}

/// Persisted form of an [`EventQueue`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct QueueState {
    /// Kind -> heap position, `None` when inactive
    pub index: Vec<Option<u32>>,

    /// Kind -> pending event, `None` when inactive
    pub slots: Vec<Option<EventRecord>>,

    /// Heap permutation of kind indices
    pub order: Vec<u32>,

    /// Number of live events
    pub count: u32,

    /// Next insertion sequence number
    pub next_seq: u64,
}
