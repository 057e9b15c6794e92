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

mod common;

use common::assertions::{assert_infrastructure, assert_pending_consistent};
use common::fixtures::{all_machines, config_for};
use retrocore::core::error::{EmulatorError, Result};
use retrocore::core::machine::{Machine, MachineKind};

fn infrastructure(kind: MachineKind) -> &'static [&'static str] {
    match kind {
        MachineKind::Gb | MachineKind::Gba => &["Ppu", "ApuSample"],
        MachineKind::N64 => &["Vi", "AiSample", "CompareTimer"],
    }
}

#[test]
fn test_basic_initialization() -> Result<()> {
    for machine in all_machines() {
        assert_eq!(machine.now(), 0);
        assert_eq!(machine.frame_count(), 0);
        assert_infrastructure(&machine, infrastructure(machine.kind()));
        assert_pending_consistent(&machine);
    }
    Ok(())
}

#[test]
fn test_frames_advance_every_machine() {
    for mut machine in all_machines() {
        let kind = machine.kind();
        let first = machine.run_frame();
        assert!(first > 0, "{kind}");
        assert_eq!(machine.frame_count(), 1, "{kind}");

        machine.run_frame();
        assert_eq!(machine.frame_count(), 2, "{kind}");
        assert_infrastructure(&machine, infrastructure(kind));
        assert_pending_consistent(&machine);
    }
}

#[test]
fn test_stepping_keeps_infrastructure_alive() {
    for mut machine in all_machines() {
        for _ in 0..5_000 {
            machine.step(97);
        }
        assert_eq!(machine.now(), 97 * 5_000);
        assert_infrastructure(&machine, infrastructure(machine.kind()));
        assert_pending_consistent(&machine);
    }
}

#[test]
fn test_system_reset() {
    for mut machine in all_machines() {
        machine.run_frame();
        machine.reset();
        assert_eq!(machine.now(), 0);
        assert_eq!(machine.frame_count(), 0);
        assert_infrastructure(&machine, infrastructure(machine.kind()));
    }
}

#[test]
fn test_config_selects_machine() {
    let mut config = config_for(MachineKind::Gb);
    config.gb.double_speed = true;

    match Machine::from_config(&config) {
        Machine::Gb(gb) => assert!(gb.is_double_speed()),
        other => panic!("expected a Game Boy, got {}", other.kind()),
    }

    let machine = Machine::from_config(&config_for(MachineKind::N64));
    assert_eq!(machine.kind(), MachineKind::N64);
}

#[test]
fn test_machine_names_parse() {
    assert_eq!("GBA".parse::<MachineKind>().ok(), Some(MachineKind::Gba));
    assert_eq!(" n64 ".parse::<MachineKind>().ok(), Some(MachineKind::N64));
    assert!(matches!(
        "snes".parse::<MachineKind>(),
        Err(EmulatorError::UnknownMachine(name)) if name == "snes"
    ));
}

#[test]
fn test_halt_without_enabled_interrupts_runs_to_limit() {
    // IE is clear after reset, so nothing can wake the CPU
    let mut machine = Machine::new(MachineKind::Gba);
    let skipped = machine.halt_until_event(1_000);
    assert!(skipped >= 1_000);
    assert_eq!(machine.now(), skipped);
    assert_pending_consistent(&machine);
}
