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

//! SIO normal mode tests

use super::super::*;
use crate::core::timing::EventDispatch;

const SIODATA32_L: u32 = IO_BASE + 0x120;
const SIODATA32_H: u32 = IO_BASE + 0x122;
const SIOCNT: u32 = IO_BASE + 0x128;
const SIODATA8: u32 = IO_BASE + 0x12A;

#[test]
fn test_8bit_transfer_at_256k() {
    let mut gba = GbaSystem::new();
    gba.write_io(IO_BASE + 0x200, Interrupts::SERIAL.bits());
    gba.write_io(SIODATA8, 0x00);
    gba.write_io(SIOCNT, 0x4081);

    gba.tick(8 * 64 - 1);
    assert_eq!(gba.read_io(SIOCNT) & 0x80, 0x80);
    assert!(gba.pending_interrupts().is_empty());

    gba.tick(1);
    assert_eq!(gba.pending_interrupts(), Interrupts::SERIAL);
    assert_eq!(gba.read_io(SIOCNT) & 0x80, 0);
    assert_eq!(gba.read_io(SIODATA8), 0xFF);
}

#[test]
fn test_32bit_transfer_at_2m() {
    let mut gba = GbaSystem::new();
    gba.write_io(SIODATA32_L, 0x1234);
    gba.write_io(SIODATA32_H, 0x0000);
    gba.write_io(SIOCNT, 0x1083);

    gba.tick(32 * 8);
    assert!(!gba.scheduler.is_active(GbaEvent::Serial));
    assert_eq!(gba.read_io(SIODATA32_L), 0xFFFF);
    assert_eq!(gba.read_io(SIODATA32_H), 0xFFFF);
    // No IRQ requested
    assert!(gba.interrupt_flag.is_empty());
}

#[test]
fn test_external_clock_waits_for_partner() {
    let mut gba = GbaSystem::new();
    gba.write_io(SIOCNT, 0x0080);
    assert!(!gba.scheduler.is_active(GbaEvent::Serial));
}

#[test]
fn test_clearing_start_aborts_transfer() {
    let mut gba = GbaSystem::new();
    gba.write_io(SIOCNT, 0x0081);
    gba.tick(100);
    gba.write_io(SIOCNT, 0x0001);
    assert!(!gba.scheduler.is_active(GbaEvent::Serial));
}
