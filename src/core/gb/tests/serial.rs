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

//! Serial transfer tests

use super::super::*;
use crate::core::timing::EventDispatch;

#[test]
fn test_internal_clock_transfer_completes() {
    let mut gb = GbSystem::new();
    gb.write_io(0xFF01, 0x55);
    gb.write_io(0xFF02, 0x81);
    assert_eq!(gb.read_io(0xFF02) & 0x80, 0x80);

    gb.tick(8 * 1024 - 1);
    assert!(!gb.interrupt_flag.contains(Interrupts::SERIAL));

    gb.tick(1);
    assert!(gb.interrupt_flag.contains(Interrupts::SERIAL));
    assert_eq!(gb.read_io(0xFF01), 0xFF);
    assert_eq!(gb.read_io(0xFF02) & 0x80, 0);
    assert!(!gb.scheduler.is_active(GbEvent::Serial));
}

#[test]
fn test_fast_clock_transfer() {
    let mut gb = GbSystem::new();
    gb.write_io(0xFF02, 0x83);
    gb.tick(8 * 16 * 2);
    assert!(gb.interrupt_flag.contains(Interrupts::SERIAL));
}

#[test]
fn test_clearing_start_bit_cancels_transfer() {
    let mut gb = GbSystem::new();
    gb.write_io(0xFF01, 0x12);
    gb.write_io(0xFF02, 0x81);
    gb.tick(1024);

    gb.write_io(0xFF02, 0x01);
    assert!(!gb.scheduler.is_active(GbEvent::Serial));
    gb.tick(16 * 1024);
    assert!(!gb.interrupt_flag.contains(Interrupts::SERIAL));
}

#[test]
fn test_external_clock_waits_for_partner() {
    let mut gb = GbSystem::new();
    gb.write_io(0xFF02, 0x80);
    gb.tick(16 * 1024);

    assert!(!gb.scheduler.is_active(GbEvent::Serial));
    assert_eq!(gb.read_io(0xFF02) & 0x80, 0x80);
}
