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

//! Scheduler: a time base plus an event queue
//!
//! The scheduler itself never calls handlers. Dispatch lives in
//! [`EventDispatch`](super::EventDispatch), which the owning machine
//! implements so that handlers can borrow the machine and the scheduler at
//! the same time.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::{Cycles, Event, EventKind, EventQueue, QueueState, Timestamp, REBASE_THRESHOLD};
use crate::core::error::SaveStateError;

/// Cycle-accurate event scheduler
///
/// # Example
///
/// ```
/// use retrocore::core::gb::GbEvent;
/// use retrocore::core::timing::Scheduler;
///
/// let mut scheduler = Scheduler::<GbEvent>::new();
/// scheduler.schedule(GbEvent::Timer, 100);
///
/// scheduler.advance(60);
/// assert!(scheduler.pop_due().is_none());
/// assert_eq!(scheduler.remaining(GbEvent::Timer), Some(40));
///
/// scheduler.advance(50);
/// let (event, elapsed) = scheduler.pop_due().unwrap();
/// assert_eq!(event.kind, GbEvent::Timer);
/// assert_eq!(elapsed, 110);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler<K: EventKind> {
    /// Current time base value
    now: Timestamp,

    /// Pending events
    queue: EventQueue<K>,
}

impl<K: EventKind> Scheduler<K> {
    /// Create a scheduler at time zero with nothing pending
    pub fn new() -> Self {
        Self {
            now: 0,
            queue: EventQueue::new(),
        }
    }

    /// Return to time zero and drop every pending event
    pub fn reset(&mut self) {
        self.now = 0;
        self.queue.clear();
    }

    /// Current time base value
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Build an event of `kind` that fires `duration` cycles from now
    #[inline]
    pub fn create_event(&self, duration: Cycles, kind: K) -> Event<K> {
        Event {
            kind,
            start: self.now,
            due: self.now + duration,
        }
    }

    /// Insert `event`, silently discarding any pending event of the same kind
    ///
    /// Use [`EventDispatch::insert_and_flush`](super::EventDispatch::insert_and_flush)
    /// when the replaced countdown's partial progress must be delivered.
    pub fn insert_silent(&mut self, event: Event<K>) {
        self.queue.remove(event.kind);
        self.push(event);
    }

    /// Shorthand for `insert_silent(create_event(duration, kind))`
    #[inline]
    pub fn schedule(&mut self, kind: K, duration: Cycles) {
        let event = self.create_event(duration, kind);
        self.insert_silent(event);
    }

    /// Remove the pending event of `kind` without running its handler
    #[inline]
    pub fn remove_silent(&mut self, kind: K) -> Option<Event<K>> {
        self.queue.remove(kind)
    }

    /// Push onto the queue; the kind must not be pending
    pub(crate) fn push(&mut self, event: Event<K>) {
        if self.queue.insert(event) {
            log::trace!("Timing: armed {event} at {}", self.now);
        }
    }

    /// The event that fires next
    #[inline]
    pub fn peek(&self) -> Option<&Event<K>> {
        self.queue.peek()
    }

    /// The pending event of `kind`
    #[inline]
    pub fn get(&self, kind: K) -> Option<&Event<K>> {
        self.queue.get(kind)
    }

    #[inline]
    pub fn is_active(&self, kind: K) -> bool {
        self.queue.is_active(kind)
    }

    /// Number of pending events
    #[inline]
    pub fn size(&self) -> usize {
        self.queue.len()
    }

    /// Cycles since the pending event of `kind` was inserted
    #[inline]
    pub fn elapsed(&self, kind: K) -> Option<Cycles> {
        self.get(kind).map(|event| event.elapsed_at(self.now))
    }

    /// Cycles until the pending event of `kind` fires
    #[inline]
    pub fn remaining(&self, kind: K) -> Option<Cycles> {
        self.get(kind).map(|event| event.remaining_at(self.now))
    }

    /// Cycles until the earliest pending event fires
    #[inline]
    pub fn next_due_in(&self) -> Option<Cycles> {
        self.peek().map(|event| event.remaining_at(self.now))
    }

    /// Iterate over pending events in heap order
    pub fn pending(&self) -> impl Iterator<Item = &Event<K>> + '_ {
        self.queue.iter()
    }

    /// Advance the time base by `delta` cycles
    ///
    /// Rebases every timestamp once `now` reaches [`REBASE_THRESHOLD`].
    /// Due events are left in the queue for [`Scheduler::pop_due`].
    pub fn advance(&mut self, delta: Cycles) {
        self.now = self
            .now
            .checked_add(delta)
            .unwrap_or_else(|| panic!("time base overflow: {} + {delta}", self.now));

        if self.now >= REBASE_THRESHOLD {
            self.rebase();
        }
    }

    /// Pop the earliest event if it is due
    ///
    /// Returns the event and the cycles elapsed since it was inserted. The
    /// elapsed count includes any overshoot past `due`, so a handler that
    /// re-arms a periodic countdown does not drift.
    pub fn pop_due(&mut self) -> Option<(Event<K>, Cycles)> {
        match self.queue.peek() {
            Some(event) if event.due <= self.now => {}
            _ => return None,
        }

        let event = self.queue.pop()?;
        Some((event, self.now - event.start))
    }

    /// Shift the time base and every pending timestamp back towards zero
    ///
    /// The offset is the earliest of `now` and every pending start, so every
    /// `now - start` and `due - now` is preserved.
    fn rebase(&mut self) {
        let offset = self
            .queue
            .iter()
            .map(|event| event.start)
            .fold(self.now, Timestamp::min);

        log::debug!("Timing: rebasing time base {} by {offset}", self.now);

        self.now -= offset;
        self.queue.rebase(offset);
    }

    /// Snapshot for a save state
    pub fn to_state(&self) -> SchedulerState {
        SchedulerState {
            now: self.now,
            queue: self.queue.to_state(),
        }
    }

    /// Rebuild from a save state, rejecting corrupted data
    pub fn from_state(state: &SchedulerState) -> Result<Self, SaveStateError> {
        let queue = EventQueue::<K>::from_state(&state.queue)?;

        if let Some(event) = queue.iter().find(|event| event.start > state.now) {
            return Err(SaveStateError::scheduler(format!(
                "{} event starts at {} after the time base {}",
                event.kind.name(),
                event.start,
                state.now
            )));
        }

        Ok(Self {
            now: state.now,
            queue,
        })
    }

    /// Reject a restored queue that lost a fixed-rate event
    pub(crate) fn require_pending(&self, kinds: &[K]) -> Result<(), SaveStateError> {
        match kinds.iter().find(|&&kind| !self.is_active(kind)) {
            Some(kind) => Err(SaveStateError::scheduler(format!(
                "{} event is missing",
                kind.name()
            ))),
            None => Ok(()),
        }
    }

    /// Reject a restored client whose running flag disagrees with the queue
    pub(crate) fn check_pending(
        &self,
        kind: K,
        running: bool,
        component: &'static str,
    ) -> Result<(), SaveStateError> {
        match (self.is_active(kind), running) {
            (true, false) => Err(SaveStateError::component(
                component,
                format!("{} event is pending for an idle client", kind.name()),
            )),
            (false, true) => Err(SaveStateError::component(
                component,
                format!("client is running without a {} event", kind.name()),
            )),
            _ => Ok(()),
        }
    }
}

impl<K: EventKind> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted form of a [`Scheduler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SchedulerState {
    /// Time base
    pub now: u64,

    /// Event queue tables
    pub queue: QueueState,
}
