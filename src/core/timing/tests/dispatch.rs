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

//! Dispatch tests (tick, flush semantics, skip-to-event, infrastructure check)

use super::*;

#[test]
fn test_tick_fires_once_with_overshoot() {
    let mut recorder = Recorder::new();
    recorder.scheduler.schedule(TestEvent::A, 100);

    recorder.tick(50);
    assert!(recorder.fired.is_empty());
    assert!(recorder.scheduler.is_active(TestEvent::A));

    recorder.tick(60);
    assert_eq!(
        recorder.fired,
        vec![Fired {
            kind: TestEvent::A,
            elapsed: 110,
            now: 110
        }]
    );
    assert!(!recorder.scheduler.is_active(TestEvent::A));
}

#[test]
fn test_silent_replace_discards_old_event() {
    let mut recorder = Recorder::new();
    recorder.scheduler.schedule(TestEvent::A, 10);
    recorder.tick(5);

    let replacement = recorder.scheduler.create_event(10, TestEvent::A);
    recorder.scheduler.insert_silent(replacement);
    assert!(recorder.fired.is_empty());

    recorder.tick(15);
    assert_eq!(recorder.kinds(), vec![TestEvent::A]);
    assert_eq!(recorder.fired[0].elapsed, 15);
}

#[test]
fn test_remove_and_flush_delivers_partial_progress() {
    let mut recorder = Recorder::new().periodic(TestEvent::A, 100);
    recorder.scheduler.schedule(TestEvent::A, 100);
    recorder.tick(30);

    let removed = recorder.remove_and_flush(TestEvent::A);
    assert_eq!(removed.map(|e| e.due), Some(100));
    assert_eq!(recorder.fired.len(), 1);
    assert_eq!(recorder.fired[0].elapsed, 30);

    // The handler's own re-arm is discarded.
    assert!(!recorder.scheduler.is_active(TestEvent::A));
}

#[test]
fn test_remove_and_flush_without_pending_event() {
    let mut recorder = Recorder::new();
    assert!(recorder.remove_and_flush(TestEvent::B).is_none());
    assert!(recorder.fired.is_empty());
}

#[test]
fn test_insert_and_flush_replaces_after_flush() {
    let mut recorder = Recorder::new();
    recorder.scheduler.schedule(TestEvent::B, 50);
    recorder.tick(20);

    let replacement = recorder.scheduler.create_event(40, TestEvent::B);
    recorder.insert_and_flush(replacement);
    assert_eq!(recorder.fired.len(), 1);
    assert_eq!(recorder.fired[0].elapsed, 20);
    assert_eq!(recorder.scheduler.get(TestEvent::B).map(|e| e.due), Some(60));

    recorder.tick(40);
    assert_eq!(recorder.fired.len(), 2);
    assert_eq!(recorder.fired[1].elapsed, 40);
}

#[test]
fn test_periodic_event_rearms_from_dispatch_time() {
    let mut recorder = Recorder::new().periodic(TestEvent::C, 100);
    recorder.scheduler.schedule(TestEvent::C, 100);

    recorder.tick(250);
    // One dispatch per tick: the re-armed event is due at 350.
    assert_eq!(recorder.fired.len(), 1);
    assert_eq!(recorder.scheduler.get(TestEvent::C).map(|e| e.due), Some(350));
}

#[test]
fn test_periodic_handler_rearms_every_period() {
    let mut recorder = Recorder::new().periodic(TestEvent::D, 10);
    recorder.scheduler.schedule(TestEvent::D, 10);
    recorder.scheduler.schedule(TestEvent::A, 100);

    recorder.tick(10);
    recorder.tick(10);
    assert_eq!(recorder.kinds(), vec![TestEvent::D, TestEvent::D]);
}

#[test]
fn test_dispatch_order_across_kinds() {
    let mut recorder = Recorder::new();
    recorder.scheduler.schedule(TestEvent::A, 40);
    recorder.scheduler.schedule(TestEvent::B, 10);
    recorder.scheduler.schedule(TestEvent::C, 30);
    recorder.scheduler.schedule(TestEvent::D, 20);

    recorder.tick(1_000);
    assert_eq!(
        recorder.kinds(),
        vec![TestEvent::B, TestEvent::D, TestEvent::C, TestEvent::A]
    );
}

#[test]
fn test_skip_to_event_rounds_up_to_alignment() {
    let mut recorder = Recorder::new();
    recorder.alignment = 4;
    recorder.scheduler.schedule(TestEvent::A, 10);

    assert_eq!(recorder.skip_to_event(), Some(12));
    assert_eq!(recorder.scheduler.now(), 12);
    assert_eq!(recorder.fired[0].elapsed, 12);
}

#[test]
fn test_skip_to_event_matches_aligned_stepping() {
    let mut template = Recorder::new().periodic(TestEvent::B, 37);
    template.alignment = 4;
    template.scheduler.schedule(TestEvent::A, 101);
    template.scheduler.schedule(TestEvent::B, 37);
    template.tick(3);

    let mut skipping = template.clone();
    let mut stepping = template;

    for _ in 0..5 {
        skipping.skip_to_event();

        let seen = stepping.fired.len();
        while stepping.fired.len() == seen {
            stepping.tick(4);
        }

        assert_eq!(skipping.fired, stepping.fired);
        assert_eq!(skipping.scheduler.now(), stepping.scheduler.now());
    }
}

#[test]
fn test_skip_to_event_with_nothing_pending() {
    let mut recorder = Recorder::new();
    assert_eq!(recorder.skip_to_event(), None);
    assert_eq!(recorder.scheduler.now(), 0);
}

#[test]
fn test_skip_to_event_already_due_does_not_advance() {
    let mut recorder = Recorder::new();
    recorder.alignment = 4;
    recorder.scheduler.schedule(TestEvent::C, 0);

    assert_eq!(recorder.skip_to_event(), Some(0));
    assert_eq!(recorder.scheduler.now(), 0);
    assert_eq!(recorder.kinds(), vec![TestEvent::C]);
}

/// Machine whose infrastructure handler forgets to re-arm
struct Stalling {
    scheduler: Scheduler<TestEvent>,
}

fn forget(_: &mut Stalling, _: Cycles) {}

impl EventDispatch for Stalling {
    type Kind = TestEvent;

    const HANDLERS: &'static [Handler<Self>] = &[forget, forget, forget, forget];
    const ALWAYS_PENDING: &'static [TestEvent] = &[TestEvent::A];

    fn scheduler(&self) -> &Scheduler<TestEvent> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<TestEvent> {
        &mut self.scheduler
    }
}

#[test]
#[should_panic(expected = "subsystem has stalled")]
fn test_dead_infrastructure_timer_is_fatal() {
    let mut machine = Stalling {
        scheduler: Scheduler::new(),
    };
    machine.scheduler.schedule(TestEvent::A, 5);
    machine.tick(5);
}

/// Machine with a handler table shorter than its kind count
struct Truncated {
    scheduler: Scheduler<TestEvent>,
}

fn ignore(_: &mut Truncated, _: Cycles) {}

impl EventDispatch for Truncated {
    type Kind = TestEvent;

    const HANDLERS: &'static [Handler<Self>] = &[ignore];

    fn scheduler(&self) -> &Scheduler<TestEvent> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<TestEvent> {
        &mut self.scheduler
    }
}

#[test]
#[should_panic(expected = "no handler registered for C")]
fn test_missing_handler_is_fatal() {
    let mut machine = Truncated {
        scheduler: Scheduler::new(),
    };
    machine.scheduler.schedule(TestEvent::C, 1);
    machine.tick(1);
}
