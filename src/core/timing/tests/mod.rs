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

//! Timing event system tests
//!
//! This module contains tests organized by category:
//! - `queue`: heap mechanics, removal, persistence validation
//! - `scheduler`: time base, rebase, due-event popping
//! - `dispatch`: handler table, flush semantics, skip-to-event
//! - `properties`: randomized heap, uniqueness, batching and rebase checks

use super::*;

mod dispatch;

/// Event kinds used by the timing tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(super) enum TestEvent {
    A,
    B,
    C,
    D,
}

impl EventKind for TestEvent {
    const COUNT: usize = 4;
    const ALL: &'static [Self] = &[TestEvent::A, TestEvent::B, TestEvent::C, TestEvent::D];

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            TestEvent::A => "A",
            TestEvent::B => "B",
            TestEvent::C => "C",
            TestEvent::D => "D",
        }
    }
}

/// A record of one handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Fired {
    pub kind: TestEvent,
    pub elapsed: Cycles,
    pub now: Timestamp,
}

/// Minimal machine that logs every dispatch and optionally re-arms
#[derive(Debug, Clone)]
pub(super) struct Recorder {
    pub scheduler: Scheduler<TestEvent>,
    pub fired: Vec<Fired>,
    /// Re-arm period per kind; `None` makes the kind one-shot
    pub rearm: [Option<Cycles>; TestEvent::COUNT],
    pub alignment: Cycles,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            scheduler: Scheduler::new(),
            fired: Vec::new(),
            rearm: [None; TestEvent::COUNT],
            alignment: 1,
        }
    }

    pub fn periodic(mut self, kind: TestEvent, period: Cycles) -> Self {
        self.rearm[kind.index()] = Some(period);
        self
    }

    fn record(&mut self, kind: TestEvent, elapsed: Cycles) {
        self.fired.push(Fired {
            kind,
            elapsed,
            now: self.scheduler.now(),
        });
        if let Some(period) = self.rearm[kind.index()] {
            self.scheduler.schedule(kind, period);
        }
    }

    pub fn kinds(&self) -> Vec<TestEvent> {
        self.fired.iter().map(|fired| fired.kind).collect()
    }
}

fn on_a(recorder: &mut Recorder, elapsed: Cycles) {
    recorder.record(TestEvent::A, elapsed);
}

fn on_b(recorder: &mut Recorder, elapsed: Cycles) {
    recorder.record(TestEvent::B, elapsed);
}

fn on_c(recorder: &mut Recorder, elapsed: Cycles) {
    recorder.record(TestEvent::C, elapsed);
}

fn on_d(recorder: &mut Recorder, elapsed: Cycles) {
    recorder.record(TestEvent::D, elapsed);
}

impl EventDispatch for Recorder {
    type Kind = TestEvent;

    const HANDLERS: &'static [Handler<Self>] = &[on_a, on_b, on_c, on_d];

    fn scheduler(&self) -> &Scheduler<TestEvent> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<TestEvent> {
        &mut self.scheduler
    }

    fn alignment(&self) -> Cycles {
        self.alignment
    }
}
