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

//! Display timing
//!
//! Each scan line is 1232 cycles: 960 of HDraw followed by 272 of HBlank.
//! Lines 0-159 are drawn, 160-227 are VBlank. The event fires at both
//! boundaries of every line.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::interrupt::Interrupts;
use crate::core::timing::Cycles;

pub const HDRAW_CYCLES: Cycles = 960;
pub const HBLANK_CYCLES: Cycles = 272;
pub const LINE_CYCLES: Cycles = HDRAW_CYCLES + HBLANK_CYCLES;
pub const VISIBLE_LINES: u16 = 160;
pub const TOTAL_LINES: u16 = 228;

const DISPSTAT_VBLANK_IRQ: u16 = 1 << 3;
const DISPSTAT_HBLANK_IRQ: u16 = 1 << 4;
const DISPSTAT_VCOUNT_IRQ: u16 = 1 << 5;

/// What happened while walking line boundaries
///
/// Boundary times are given as cycles before the end of the dispatch, so a
/// late dispatch can still start DMA from the cycle the boundary passed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PpuSignals {
    pub irq: Interrupts,

    /// Cycles since VBlank was entered (starts VBlank DMA)
    pub vblank: Option<Cycles>,

    /// Cycles since each HBlank on a visible line, oldest first (starts
    /// HBlank DMA)
    pub hblank: Vec<Cycles>,
}

/// Display timing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GbaPpu {
    vcount: u16,
    in_hblank: bool,

    /// DISPSTAT writable bits (IRQ enables, VCOUNT setting)
    dispstat: u16,

    /// Cycles into the current half of the line not yet consumed
    progress: Cycles,

    frames: u64,
}

impl GbaPpu {
    pub fn new() -> Self {
        Self {
            vcount: 0,
            in_hblank: false,
            dispstat: 0,
            progress: 0,
            frames: 0,
        }
    }

    #[inline]
    pub fn vcount(&self) -> u16 {
        self.vcount
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn in_vblank(&self) -> bool {
        (VISIBLE_LINES..TOTAL_LINES - 1).contains(&self.vcount)
    }

    #[inline]
    pub fn in_hblank(&self) -> bool {
        self.in_hblank
    }

    /// DISPSTAT register
    pub fn dispstat(&self) -> u16 {
        let vcount_match = self.vcount == self.dispstat >> 8;
        self.dispstat
            | u16::from(self.in_vblank())
            | u16::from(self.in_hblank) << 1
            | u16::from(vcount_match) << 2
    }

    pub fn write_dispstat(&mut self, value: u16) {
        self.dispstat = value & 0xFF38;
    }

    fn phase_length(&self) -> Cycles {
        if self.in_hblank {
            HBLANK_CYCLES
        } else {
            HDRAW_CYCLES
        }
    }

    /// Delay until the next boundary
    #[inline]
    pub fn next_delay(&self) -> Cycles {
        self.phase_length() - self.progress
    }

    /// Boundary event handler
    pub fn on_event(&mut self, elapsed: Cycles) -> (Cycles, PpuSignals) {
        self.progress += elapsed;

        let mut signals = PpuSignals::default();
        while self.progress >= self.phase_length() {
            self.progress -= self.phase_length();
            self.cross_boundary(&mut signals);
        }

        (self.next_delay(), signals)
    }

    fn cross_boundary(&mut self, signals: &mut PpuSignals) {
        if !self.in_hblank {
            self.in_hblank = true;
            if self.dispstat & DISPSTAT_HBLANK_IRQ != 0 {
                signals.irq |= Interrupts::HBLANK;
            }
            if self.vcount < VISIBLE_LINES {
                signals.hblank.push(self.progress);
            }
            return;
        }

        self.in_hblank = false;
        self.vcount = (self.vcount + 1) % TOTAL_LINES;

        if self.vcount == VISIBLE_LINES {
            self.frames += 1;
            signals.vblank = Some(self.progress);
            if self.dispstat & DISPSTAT_VBLANK_IRQ != 0 {
                signals.irq |= Interrupts::VBLANK;
            }
        }

        if self.vcount == self.dispstat >> 8 && self.dispstat & DISPSTAT_VCOUNT_IRQ != 0 {
            signals.irq |= Interrupts::VCOUNT;
        }
    }
}

impl Default for GbaPpu {
    fn default() -> Self {
        Self::new()
    }
}
