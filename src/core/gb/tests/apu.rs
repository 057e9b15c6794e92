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

//! APU channel and mixer tests

use super::super::*;
use crate::core::timing::EventDispatch;

fn start_square(gb: &mut GbSystem, frequency: u16) {
    gb.write_io(0xFF12, 0xF0);
    gb.write_io(0xFF13, frequency as u8);
    gb.write_io(0xFF14, 0x80 | (frequency >> 8) as u8);
}

#[test]
fn test_trigger_arms_channel_event() {
    let mut gb = GbSystem::new();
    start_square(&mut gb, 0x7FF);

    assert_eq!(gb.scheduler.remaining(GbEvent::ApuChannel1), Some(8));
    assert_eq!(gb.read_io(0xFF26) & 0x01, 0x01);
}

#[test]
fn test_dac_off_stops_channel() {
    let mut gb = GbSystem::new();
    start_square(&mut gb, 0x7FF);
    gb.tick(20);

    gb.write_io(0xFF12, 0x00);
    assert!(!gb.scheduler.is_active(GbEvent::ApuChannel1));
    assert_eq!(gb.read_io(0xFF26) & 0x01, 0);
}

#[test]
fn test_frequency_write_keeps_phase_progress() {
    let mut gb = GbSystem::new();
    start_square(&mut gb, 0x700);
    assert_eq!(gb.scheduler.remaining(GbEvent::ApuChannel1), Some(2048));

    gb.tick(1000);
    gb.write_io(0xFF13, 0x80);
    assert_eq!(gb.apu().channel(0).period_ticks(), 1024);
    assert_eq!(gb.scheduler.remaining(GbEvent::ApuChannel1), Some(24));
}

#[test]
fn test_channel_phase_advances_with_late_dispatch() {
    let mut gb = GbSystem::new();
    start_square(&mut gb, 0x7FF);

    gb.tick(8 * 5 + 3);
    assert_eq!(gb.apu().channel(0).position(), 5);
    assert_eq!(gb.scheduler.remaining(GbEvent::ApuChannel1), Some(5));
}

#[test]
fn test_power_off_silences_every_channel() {
    let mut gb = GbSystem::new();
    start_square(&mut gb, 0x7FF);
    gb.write_io(0xFF21, 0xF0);
    gb.write_io(0xFF23, 0x80);

    gb.write_io(0xFF26, 0x00);
    assert_eq!(gb.read_io(0xFF26), 0x70);
    for index in 0..4 {
        assert!(!gb.scheduler.is_active(GbEvent::apu_channel(index)));
    }
}

#[test]
fn test_mixer_emits_32768_samples_per_second() {
    let mut gb = GbSystem::new();
    gb.tick(CLOCK_HZ / 64);
    assert_eq!(gb.drain_samples().len(), 32_768 / 64);
    assert!(gb.drain_samples().is_empty());
}
