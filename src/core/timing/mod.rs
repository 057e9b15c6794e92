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

//! Timing Event System
//!
//! This module implements the cycle-accurate event scheduler shared by every
//! machine core. Each machine owns one [`Scheduler`] and drives it from its
//! processor loop.
//!
//! # Architecture
//!
//! - A virtual time base ([`Timestamp`]) counts machine ticks since reset.
//! - An [`EventQueue`] keeps pending events in a fixed-capacity binary
//!   min-heap ordered by due time, with a per-kind side table for O(log n)
//!   removal of any pending event.
//! - Every machine declares a closed event enum implementing [`EventKind`].
//!   A kind names a *slot*: at most one event of each kind is pending.
//! - The machine implements [`EventDispatch`], binding each kind to a
//!   handler in a fixed table. Handlers receive the cycles elapsed since the
//!   event was inserted and usually re-arm their own next occurrence.
//!
//! Events with equal due times fire in insertion order.
//!
//! # Example
//!
//! ```
//! use retrocore::core::timing::{Cycles, EventDispatch, EventKind, Handler, Scheduler};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind {
//!     Tick,
//! }
//!
//! impl EventKind for Kind {
//!     const COUNT: usize = 1;
//!     const ALL: &'static [Self] = &[Kind::Tick];
//!     fn index(self) -> usize {
//!         self as usize
//!     }
//!     fn name(self) -> &'static str {
//!         "Tick"
//!     }
//! }
//!
//! struct Clock {
//!     scheduler: Scheduler<Kind>,
//!     ticks: u32,
//! }
//!
//! fn on_tick(clock: &mut Clock, _elapsed: Cycles) {
//!     clock.ticks += 1;
//!     clock.scheduler.schedule(Kind::Tick, 100);
//! }
//!
//! impl EventDispatch for Clock {
//!     type Kind = Kind;
//!     const HANDLERS: &'static [Handler<Self>] = &[on_tick];
//!     fn scheduler(&self) -> &Scheduler<Kind> {
//!         &self.scheduler
//!     }
//!     fn scheduler_mut(&mut self) -> &mut Scheduler<Kind> {
//!         &mut self.scheduler
//!     }
//! }
//!
//! let mut clock = Clock { scheduler: Scheduler::new(), ticks: 0 };
//! clock.scheduler.schedule(Kind::Tick, 100);
//! clock.tick(350);
//! assert_eq!(clock.ticks, 3);
//! ```

use std::fmt;

pub mod countdown;
pub mod dispatch;
pub mod queue;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use countdown::Countdown;
pub use dispatch::{EventDispatch, Handler};
pub use queue::{EventQueue, EventRecord, QueueState};
pub use scheduler::{Scheduler, SchedulerState};

/// Absolute time in machine ticks since reset (or since the last rebase)
pub type Timestamp = u64;

/// Relative time in machine ticks
pub type Cycles = u64;

/// Once `now` reaches this value the scheduler rebases every timestamp
/// back towards zero.
pub const REBASE_THRESHOLD: Timestamp = 1 << 63;

/// A closed set of event kinds declared by one machine
///
/// Kinds map one-to-one onto `0..COUNT`; that index selects both the queue
/// slot and the handler table entry.
pub trait EventKind: Copy + Eq + fmt::Debug + 'static {
    /// Number of declared kinds (the queue capacity)
    const COUNT: usize;

    /// Every kind, ordered by [`EventKind::index`]
    const ALL: &'static [Self];

    /// Slot index in `0..COUNT`
    fn index(self) -> usize;

    /// Human readable name for logs and debug output
    fn name(self) -> &'static str;

    /// Inverse of [`EventKind::index`]
    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// A single scheduled occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<K> {
    /// Slot this event occupies
    pub kind: K,

    /// Time base value at (re)insertion
    pub start: Timestamp,

    /// Time base value at which the event fires
    pub due: Timestamp,
}

impl<K: EventKind> Event<K> {
    /// Total length of the countdown this event represents
    #[inline]
    pub fn duration(&self) -> Cycles {
        self.due - self.start
    }

    /// Cycles accrued between insertion and `now`
    #[inline]
    pub fn elapsed_at(&self, now: Timestamp) -> Cycles {
        now.saturating_sub(self.start)
    }

    /// Cycles left until the event fires, zero once overdue
    #[inline]
    pub fn remaining_at(&self, now: Timestamp) -> Cycles {
        self.due.saturating_sub(now)
    }
}

impl<K: EventKind> fmt::Display for Event<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}..{}]", self.kind.name(), self.start, self.due)
    }
}
