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

//! Custom assertions for scheduler testing

use retrocore::core::machine::Machine;
use retrocore::core::timing::{Cycles, EventKind, Scheduler};

/// Assert `kind` is pending with `expected` cycles to go
#[allow(dead_code)]
pub fn assert_remaining<K: EventKind>(scheduler: &Scheduler<K>, kind: K, expected: Cycles) {
    let actual = scheduler.remaining(kind);
    assert_eq!(
        actual,
        Some(expected),
        "{} remaining mismatch: expected {}, got {:?}",
        kind.name(),
        expected,
        actual
    );
}

/// Assert every infrastructure event of `machine` is still pending
#[allow(dead_code)]
pub fn assert_infrastructure(machine: &Machine, kinds: &[&str]) {
    let pending = machine.pending_events();
    for kind in kinds {
        assert!(
            pending.iter().any(|event| event.kind == *kind),
            "{} has no pending {} event: {:?}",
            machine.kind(),
            kind,
            pending
        );
    }
}

/// Assert the pending list is sorted and due times agree with `now`
#[allow(dead_code)]
pub fn assert_pending_consistent(machine: &Machine) {
    let now = machine.now();
    let pending = machine.pending_events();
    for pair in pending.windows(2) {
        assert!(pair[0].due <= pair[1].due, "unsorted: {:?}", pending);
    }
    for event in &pending {
        assert_eq!(event.due - now, event.due_in, "{:?} at {}", event, now);
    }
}
