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

//! Event dispatch
//!
//! A machine binds its event enum to handlers by implementing
//! [`EventDispatch`]. The handler table is a plain slice of function
//! pointers indexed by [`EventKind::index`], so dispatch is one bounds-checked
//! load and an indirect call.

use super::{Cycles, Event, EventKind, Scheduler};

/// Event handler: receives the machine and the cycles elapsed since the
/// event was inserted
pub type Handler<M> = fn(&mut M, Cycles);

/// Event dispatch for a machine that owns a [`Scheduler`]
pub trait EventDispatch: Sized + 'static {
    /// The machine's closed event enum
    type Kind: EventKind;

    /// Handler per kind, indexed by [`EventKind::index`]
    const HANDLERS: &'static [Handler<Self>];

    /// Fixed-rate kinds that must be pending at all times
    const ALWAYS_PENDING: &'static [Self::Kind] = &[];

    fn scheduler(&self) -> &Scheduler<Self::Kind>;

    fn scheduler_mut(&mut self) -> &mut Scheduler<Self::Kind>;

    /// Granularity of [`EventDispatch::skip_to_event`], in time base ticks
    fn alignment(&self) -> Cycles {
        1
    }

    /// Run the handler for `kind`
    ///
    /// # Panics
    ///
    /// Panics if the handler table has no entry for `kind`.
    fn dispatch(&mut self, kind: Self::Kind, elapsed: Cycles) {
        let handler = match Self::HANDLERS.get(kind.index()) {
            Some(handler) => *handler,
            None => panic!(
                "no handler registered for {} (table has {} entries)",
                kind.name(),
                Self::HANDLERS.len()
            ),
        };

        log::trace!(
            "Timing: dispatching {} at {} (elapsed {elapsed})",
            kind.name(),
            self.scheduler().now()
        );
        handler(self, elapsed);
    }

    /// Advance time by `cycles` and dispatch every event that came due,
    /// earliest first
    fn tick(&mut self, cycles: Cycles) {
        self.scheduler_mut().advance(cycles);
        self.run_due_events();
    }

    /// Dispatch every event whose due time has passed
    fn run_due_events(&mut self) {
        while let Some((event, elapsed)) = self.scheduler_mut().pop_due() {
            self.dispatch(event.kind, elapsed);
        }
        self.check_infrastructure();
    }

    /// Remove the pending event of `kind` and deliver its partial progress
    ///
    /// The handler runs once with the cycles accrued so far. Anything the
    /// handler re-arms for the same kind is discarded: the caller decides
    /// what, if anything, runs next.
    fn remove_and_flush(&mut self, kind: Self::Kind) -> Option<Event<Self::Kind>> {
        let event = self.scheduler_mut().remove_silent(kind)?;
        let elapsed = event.elapsed_at(self.scheduler().now());

        log::trace!("Timing: flushing {event} after {elapsed} cycles");
        self.dispatch(kind, elapsed);
        self.scheduler_mut().remove_silent(kind);

        Some(event)
    }

    /// Insert `event`, first flushing any pending event of the same kind
    fn insert_and_flush(&mut self, event: Event<Self::Kind>) {
        self.remove_and_flush(event.kind);
        self.scheduler_mut().push(event);
    }

    /// Jump straight to the next pending event and dispatch it
    ///
    /// The jump is rounded up to [`EventDispatch::alignment`], so the result
    /// is identical to ticking one aligned step at a time. Returns the cycles
    /// skipped, or `None` when nothing is pending.
    fn skip_to_event(&mut self) -> Option<Cycles> {
        let remaining = self.scheduler().next_due_in()?;
        let alignment = self.alignment().max(1);
        let skipped = remaining.div_ceil(alignment) * alignment;

        log::trace!("Timing: skipping {skipped} cycles to the next event");
        self.tick(skipped);
        Some(skipped)
    }

    /// Assert that every fixed-rate event is still pending
    ///
    /// # Panics
    ///
    /// A missing infrastructure event would stall its subsystem for the rest
    /// of the run, so it is treated as a defect.
    fn check_infrastructure(&self) {
        for &kind in Self::ALWAYS_PENDING {
            assert!(
                self.scheduler().is_active(kind),
                "{} event is no longer scheduled; its subsystem has stalled",
                kind.name()
            );
        }
    }
}
