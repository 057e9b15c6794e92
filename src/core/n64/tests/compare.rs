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

//! CP0 COUNT/COMPARE tests

use super::super::*;
use crate::core::timing::EventDispatch;

#[test]
fn test_compare_match_asserts_ip7() {
    let mut n64 = N64System::new();
    n64.write_cop0_compare(100);

    assert_eq!(n64.halt_until_interrupt(10_000), 200);
    assert_eq!(n64.cause_ip(), 0x80);
    assert_eq!(n64.cop0_count(), 100);

    n64.write_cop0_compare(300);
    assert!(!n64.interrupt_pending());
}

#[test]
fn test_count_reads_in_flight() {
    let mut n64 = N64System::new();
    n64.tick(1001);
    assert_eq!(n64.cop0_count(), 500);

    n64.write_cop0_count(10);
    assert_eq!(n64.cop0_count(), 10);
    // The odd cycle before the write still counts towards the next increment
    n64.tick(1);
    assert_eq!(n64.cop0_count(), 11);
}

#[test]
fn test_compare_write_rearms_from_current_count() {
    let mut n64 = N64System::new();
    n64.tick(1001);
    n64.write_cop0_compare(1000);
    assert_eq!(n64.scheduler.remaining(N64Event::CompareTimer), Some(999));
}

#[test]
fn test_compare_event_is_always_pending() {
    let mut n64 = N64System::new();
    n64.write_cop0_count(0);
    n64.write_cop0_compare(0);
    assert!(n64.scheduler.is_active(N64Event::CompareTimer));
    n64.check_infrastructure();
}
