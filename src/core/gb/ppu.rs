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

//! LCD timing
//!
//! Only the mode sequence is modelled; pixel fetch is not. The event fires
//! at every mode boundary:
//!
//! ```text
//! line 0..143:  OAM scan (80) -> transfer (172) -> HBlank (204)
//! line 144..153: VBlank (456 per line)
//! ```
//!
//! Lengths are in dots. The dot clock is fixed at 4.194304 MHz regardless of
//! the CPU speed, so one dot is always two time base ticks.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::interrupt::Interrupts;
use crate::core::timing::Cycles;

/// Time base ticks per dot
pub const DOT_TICKS: Cycles = 2;

/// Dots per scan line
pub const LINE_DOTS: Cycles = 456;

/// Visible lines
pub const VISIBLE_LINES: u8 = 144;

/// Lines per frame including VBlank
pub const TOTAL_LINES: u8 = 154;

const OAM_SCAN_DOTS: Cycles = 80;
const TRANSFER_DOTS: Cycles = 172;
const HBLANK_DOTS: Cycles = LINE_DOTS - OAM_SCAN_DOTS - TRANSFER_DOTS;

const STAT_HBLANK_IRQ: u8 = 1 << 3;
const STAT_VBLANK_IRQ: u8 = 1 << 4;
const STAT_OAM_IRQ: u8 = 1 << 5;
const STAT_LYC_IRQ: u8 = 1 << 6;

/// LCD mode as reported in STAT bits 0-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[repr(u8)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

/// LCD timing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Ppu {
    mode: Mode,

    /// Current scan line (LY)
    ly: u8,

    /// LY compare (LYC)
    lyc: u8,

    /// STAT interrupt enables (bits 3-6)
    stat: u8,

    /// Ticks into the current mode not yet consumed
    progress: Cycles,

    /// Completed frames
    frames: u64,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            mode: Mode::OamScan,
            ly: 0,
            lyc: 0,
            stat: 0,
            progress: 0,
            frames: 0,
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn ly(&self) -> u8 {
        self.ly
    }

    #[inline]
    pub fn lyc(&self) -> u8 {
        self.lyc
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// STAT register
    pub fn stat(&self) -> u8 {
        let coincidence = if self.ly == self.lyc { 0x04 } else { 0 };
        0x80 | self.stat | coincidence | self.mode as u8
    }

    pub fn write_stat(&mut self, value: u8) {
        self.stat = value & 0x78;
    }

    pub fn write_lyc(&mut self, value: u8) {
        self.lyc = value;
    }

    /// Length of the current mode in ticks
    fn mode_length(&self) -> Cycles {
        let dots = match self.mode {
            Mode::OamScan => OAM_SCAN_DOTS,
            Mode::Transfer => TRANSFER_DOTS,
            Mode::HBlank => HBLANK_DOTS,
            Mode::VBlank => LINE_DOTS,
        };
        dots * DOT_TICKS
    }

    /// Delay until the next mode boundary
    #[inline]
    pub fn next_delay(&self) -> Cycles {
        self.mode_length() - self.progress
    }

    /// Dot position within the current line
    ///
    /// `elapsed` is the time since the event was armed.
    pub fn dot(&self, elapsed: Cycles) -> Cycles {
        let before = match self.mode {
            Mode::OamScan | Mode::VBlank => 0,
            Mode::Transfer => OAM_SCAN_DOTS,
            Mode::HBlank => OAM_SCAN_DOTS + TRANSFER_DOTS,
        };
        before + (self.progress + elapsed) / DOT_TICKS
    }

    /// Mode boundary handler
    ///
    /// Walks every boundary crossed in `elapsed` and returns the delay to the
    /// next one together with the interrupts raised on the way.
    pub fn on_event(&mut self, elapsed: Cycles) -> (Cycles, Interrupts) {
        self.progress += elapsed;

        let mut raised = Interrupts::empty();
        while self.progress >= self.mode_length() {
            self.progress -= self.mode_length();
            raised |= self.enter_next_mode();
        }

        (self.next_delay(), raised)
    }

    fn enter_next_mode(&mut self) -> Interrupts {
        let mut raised = Interrupts::empty();

        match self.mode {
            Mode::OamScan => self.mode = Mode::Transfer,
            Mode::Transfer => {
                self.mode = Mode::HBlank;
                if self.stat & STAT_HBLANK_IRQ != 0 {
                    raised |= Interrupts::STAT;
                }
            }
            Mode::HBlank | Mode::VBlank => {
                self.ly += 1;
                if self.ly == TOTAL_LINES {
                    self.ly = 0;
                }

                if self.ly == VISIBLE_LINES {
                    self.mode = Mode::VBlank;
                    self.frames += 1;
                    raised |= Interrupts::VBLANK;
                    if self.stat & STAT_VBLANK_IRQ != 0 {
                        raised |= Interrupts::STAT;
                    }
                } else if self.ly < VISIBLE_LINES {
                    self.mode = Mode::OamScan;
                    if self.stat & STAT_OAM_IRQ != 0 {
                        raised |= Interrupts::STAT;
                    }
                }

                if self.ly == self.lyc && self.stat & STAT_LYC_IRQ != 0 {
                    raised |= Interrupts::STAT;
                }
            }
        }

        raised
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
