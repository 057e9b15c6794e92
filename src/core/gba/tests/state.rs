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

//! Save state restore tests

use super::super::*;
use crate::core::error::SaveStateError;
use crate::core::timing::EventDispatch;

fn busy_system() -> GbaSystem {
    let mut gba = GbaSystem::new();
    gba.write_io(IO_BASE + 0x100, 0xF000);
    gba.write_io(IO_BASE + 0x102, 0x00C1);
    gba.write_io(IO_BASE + 0x106, 0x0084);
    gba.write_io(IO_BASE + 0x0C6, 0x9200);
    gba.write_io(IO_BASE + 0x128, 0x4081);
    gba.write_io(IO_BASE + 0x062, 0xF000);
    gba.write_io(IO_BASE + 0x064, 0x8700);
    gba.tick(777);
    gba
}

#[test]
fn test_restored_system_runs_identically() {
    let mut original = busy_system();
    let mut restored = GbaSystem::from_state(&original.to_state()).unwrap();

    for _ in 0..50 {
        original.tick(311);
        restored.tick(311);
    }
    assert_eq!(original.to_state(), restored.to_state());
    assert_eq!(
        original.read_io(IO_BASE + 0x100),
        restored.read_io(IO_BASE + 0x100)
    );
}

#[test]
fn test_missing_display_event_is_rejected() {
    let mut gba = GbaSystem::new();
    gba.scheduler.remove_silent(GbaEvent::Ppu);

    let result = GbaSystem::from_state(&gba.to_state());
    assert!(matches!(result, Err(SaveStateError::CorruptedScheduler(_))));
}

#[test]
fn test_stopped_timer_with_event_is_rejected() {
    let mut state = busy_system().to_state();
    state.timers[0].write_control(0x0000);

    let result = GbaSystem::from_state(&state);
    assert!(matches!(
        result,
        Err(SaveStateError::CorruptedComponent { component: "timer", .. })
    ));
}

#[test]
fn test_immediate_dma_without_event_is_rejected() {
    let mut state = GbaSystem::new().to_state();
    state.dma[0].write_control(0x8000);

    let result = GbaSystem::from_state(&state);
    assert!(matches!(
        result,
        Err(SaveStateError::CorruptedComponent { component: "dma", .. })
    ));
}

#[test]
fn test_invalid_interrupt_bits_are_rejected() {
    let mut state = GbaSystem::new().to_state();
    state.interrupt_flag = 0xC000;
    assert!(GbaSystem::from_state(&state).is_err());
}
