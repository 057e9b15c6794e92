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

//! DMA channels 0-3
//!
//! Only the timing side of a transfer is modelled: the channel is busy for
//! the transfer length and raises its interrupt when the completion event
//! fires. Address arithmetic and the bus copy belong to the memory system.
//!
//! ```text
//! DMAxCNT_H bit | Meaning
//! --------------|------------------------------------------
//! 9             | Repeat
//! 10            | 32-bit units
//! 12-13         | Start timing (0 now, 1 VBlank, 2 HBlank, 3 special)
//! 14            | IRQ on completion
//! 15            | Enable
//! ```

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::Cycles;

const CONTROL_REPEAT: u16 = 1 << 9;
const CONTROL_IRQ: u16 = 1 << 14;
const CONTROL_ENABLE: u16 = 1 << 15;

/// When an enabled channel starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTiming {
    Immediate,
    VBlank,
    HBlank,
    Special,
}

/// One DMA channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DmaChannel {
    /// Channel number (0-3)
    index: u8,

    /// DMAxCNT_L
    count: u16,

    /// DMAxCNT_H
    control: u16,

    /// Units moved by completed transfers
    transferred: u64,
}

impl DmaChannel {
    pub fn new(index: u8) -> Self {
        Self {
            index,
            count: 0,
            control: 0,
            transferred: 0,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.control & CONTROL_ENABLE != 0
    }

    #[inline]
    pub fn control(&self) -> u16 {
        self.control
    }

    #[inline]
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn start_timing(&self) -> StartTiming {
        match (self.control >> 12) & 0x03 {
            0 => StartTiming::Immediate,
            1 => StartTiming::VBlank,
            2 => StartTiming::HBlank,
            _ => StartTiming::Special,
        }
    }

    /// Units per transfer; a count of zero means the maximum
    pub fn units(&self) -> Cycles {
        match (self.count, self.index) {
            (0, 3) => 0x10000,
            (0, _) => 0x4000,
            (count, _) => Cycles::from(count),
        }
    }

    /// Transfer length: two cycles of setup, two per unit, two to finish
    #[inline]
    pub fn duration(&self) -> Cycles {
        4 + 2 * self.units()
    }

    pub fn write_count(&mut self, value: u16) {
        self.count = if self.index == 3 { value } else { value & 0x3FFF };
    }

    /// Control write; returns true when the channel was just enabled
    pub fn write_control(&mut self, value: u16) -> bool {
        let starting = !self.is_enabled() && value & CONTROL_ENABLE != 0;
        self.control = value & 0xF7E0;
        starting
    }

    /// Completion handler; returns whether to raise the channel interrupt
    pub fn finish(&mut self) -> bool {
        self.transferred += self.units();

        let repeats = self.control & CONTROL_REPEAT != 0
            && self.start_timing() != StartTiming::Immediate;
        if !repeats {
            self.control &= !CONTROL_ENABLE;
        }

        self.control & CONTROL_IRQ != 0
    }
}
