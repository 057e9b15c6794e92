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

//! Video interface tests

use super::super::*;
use crate::core::timing::EventDispatch;

#[test]
fn test_field_timing() {
    let mut n64 = N64System::new();
    assert_eq!(n64.run_frame(), vi::CYCLES_PER_LINE * 262);
    assert_eq!(n64.frame_count(), 1);
    assert_eq!(n64.read_register(VI_V_CURRENT), 0);
}

#[test]
fn test_vi_interrupt_on_programmed_line() {
    let mut n64 = N64System::new();
    n64.write_register(MI_INTR_MASK, 1 << 7);
    n64.write_register(VI_V_INTR, 0x10);

    assert_eq!(n64.halt_until_interrupt(1_000_000), vi::CYCLES_PER_LINE * 8);
    assert_eq!(n64.read_register(VI_V_CURRENT), 0x10);
    assert_eq!(n64.read_register(MI_INTR), MiInterrupts::VI.bits());
    assert_eq!(n64.cause_ip(), 0x04);

    n64.write_register(VI_V_CURRENT, 0);
    assert!(!n64.interrupt_pending());
}

#[test]
fn test_masked_line_does_not_wake() {
    let mut n64 = N64System::new();
    n64.write_register(VI_V_INTR, 0x10);

    let skipped = n64.halt_until_interrupt(vi::CYCLES_PER_LINE * 20);
    assert!(skipped >= vi::CYCLES_PER_LINE * 20);
    assert_eq!(n64.read_register(MI_INTR), MiInterrupts::VI.bits());
    assert!(!n64.interrupt_pending());
}
