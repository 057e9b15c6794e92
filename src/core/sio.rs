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

//! Bit-clocked serial shift register
//!
//! Used by both handhelds for internally clocked transfers. With no link
//! partner attached every incoming bit reads as 1, so a completed transfer
//! leaves all ones in the data register.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::timing::{Countdown, Cycles};

/// Result of a bit-clock event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// More bits to shift; re-arm after this many ticks
    Continue(Cycles),
    /// Last bit shifted; raise the completion interrupt
    Complete,
}

/// Serial port shift register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SerialPort {
    /// Shift register contents
    data: u32,

    /// Transfer width in bits (8 or 32)
    width: u8,

    /// Bits shifted so far
    shifted: u8,

    /// Bit clock countdown
    countdown: Countdown,

    active: bool,
}

impl SerialPort {
    /// Create an idle port
    ///
    /// * `unit` - Time base ticks per port clock cycle
    pub fn new(unit: Cycles) -> Self {
        Self {
            data: 0,
            width: 8,
            shifted: 0,
            countdown: Countdown::new(1, unit),
            active: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Shift register contents
    #[inline]
    pub fn data(&self) -> u32 {
        self.data
    }

    /// Load the shift register while idle
    pub fn set_data(&mut self, data: u32) {
        self.data = data;
    }

    /// Bits left to shift
    #[inline]
    pub fn bits_remaining(&self) -> u8 {
        self.width - self.shifted
    }

    /// Start an internally clocked transfer
    ///
    /// Returns the delay until the first bit completes.
    ///
    /// # Arguments
    ///
    /// * `width` - Bits to transfer (8 or 32)
    /// * `bit_period` - Port clock cycles per bit
    pub fn start(&mut self, width: u8, bit_period: Cycles) -> Cycles {
        debug_assert!(width == 8 || width == 32, "unsupported transfer width {width}");
        self.width = width;
        self.shifted = 0;
        self.active = true;
        self.countdown.set_period(bit_period);
        self.countdown.restart();
        self.countdown.delay_for(1)
    }

    /// Delay until the next bit completes
    #[inline]
    pub fn next_delay(&self) -> Cycles {
        self.countdown.delay_for(1)
    }

    /// Stop a transfer in progress
    pub fn abort(&mut self) {
        self.active = false;
    }

    /// Change the time base ticks per port clock cycle
    pub fn set_unit(&mut self, unit: Cycles) {
        self.countdown.set_unit(unit);
    }

    /// Bit clock event handler
    pub fn on_bits(&mut self, elapsed: Cycles) -> Transfer {
        if !self.active {
            return Transfer::Complete;
        }

        let steps = self.countdown.advance(elapsed);
        let bits = steps.min(u64::from(self.bits_remaining())) as u8;
        for _ in 0..bits {
            self.data = (self.data << 1) | 1;
        }
        if self.width < 32 {
            self.data &= (1 << self.width) - 1;
        }
        self.shifted += bits;

        if self.shifted == self.width {
            self.active = false;
            Transfer::Complete
        } else {
            Transfer::Continue(self.countdown.delay_for(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_completes_after_width_bits() {
        let mut port = SerialPort::new(1);
        port.set_data(0x00);
        let delay = port.start(8, 512);
        assert_eq!(delay, 512);

        let mut elapsed = delay;
        for _ in 0..7 {
            match port.on_bits(elapsed) {
                Transfer::Continue(next) => elapsed = next,
                Transfer::Complete => panic!("transfer finished early"),
            }
        }
        assert_eq!(port.on_bits(elapsed), Transfer::Complete);
        assert_eq!(port.data(), 0xFF);
        assert!(!port.is_active());
    }

    #[test]
    fn test_late_dispatch_shifts_several_bits() {
        let mut port = SerialPort::new(2);
        port.set_data(0x0F);
        port.start(8, 8);

        // Three bits' worth of ticks plus change
        assert_eq!(port.on_bits(16 * 3 + 5), Transfer::Continue(11));
        assert_eq!(port.bits_remaining(), 5);
        assert_eq!(port.data(), 0x7F);
    }

    #[test]
    fn test_wide_transfer_keeps_32_bits() {
        let mut port = SerialPort::new(1);
        port.set_data(0x8000_0000);
        port.start(32, 8);
        assert_eq!(port.on_bits(8 * 32), Transfer::Complete);
        assert_eq!(port.data(), 0xFFFF_FFFF);
    }
}
