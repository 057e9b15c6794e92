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

//! Timers 0-3
//!
//! ## Registers (per timer, 4 bytes apart from 0x04000100)
//!
//! - **TMxCNT_L**: reads the counter, writes the reload value
//! - **TMxCNT_H**: control
//!
//! ```text
//! Bit | Meaning
//! ----|---------------------------------------------
//! 0-1 | Prescaler (1, 64, 256, 1024 cycles)
//! 2   | Count-up: clocked by the previous timer's overflow
//! 6   | IRQ on overflow
//! 7   | Enable
//! ```
//!
//! A free-running timer keeps one overflow event armed for the moment its
//! counter wraps. Count-up timers have no event of their own: they advance
//! when the timer below them overflows.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::{Countdown, Cycles};

/// Cycles per increment for each prescaler setting
pub const PRESCALERS: [Cycles; 4] = [1, 64, 256, 1024];

const CONTROL_COUNT_UP: u16 = 1 << 2;
const CONTROL_IRQ: u16 = 1 << 6;
const CONTROL_ENABLE: u16 = 1 << 7;

/// One of the four timers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GbaTimer {
    /// Timer number (0-3); timer 0 cannot count up
    index: u8,

    counter: u16,
    reload: u16,
    control: u16,

    /// Prescaler countdown
    countdown: Countdown,
}

impl GbaTimer {
    pub fn new(index: u8) -> Self {
        Self {
            index,
            counter: 0,
            reload: 0,
            control: 0,
            countdown: Countdown::new(PRESCALERS[0], 1),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.control & CONTROL_ENABLE != 0
    }

    /// Clocked by the previous timer's overflow
    #[inline]
    pub fn is_count_up(&self) -> bool {
        self.index > 0 && self.control & CONTROL_COUNT_UP != 0
    }

    #[inline]
    pub fn irq_enabled(&self) -> bool {
        self.control & CONTROL_IRQ != 0
    }

    /// Whether this timer should have an overflow event pending
    #[inline]
    pub fn is_free_running(&self) -> bool {
        self.is_enabled() && !self.is_count_up()
    }

    #[inline]
    pub fn control(&self) -> u16 {
        self.control
    }

    #[inline]
    pub fn reload(&self) -> u16 {
        self.reload
    }

    /// Counter as the CPU would read it
    ///
    /// `elapsed` is the time since the overflow event was armed, if it is
    /// pending.
    pub fn counter(&self, elapsed: Option<Cycles>) -> u16 {
        match elapsed {
            Some(elapsed) => {
                (u64::from(self.counter) + self.countdown.peek(elapsed)).min(0xFFFF) as u16
            }
            None => self.counter,
        }
    }

    /// Delay until the counter next wraps
    #[inline]
    pub fn overflow_delay(&self) -> Cycles {
        self.countdown.delay_for(0x10000 - u64::from(self.counter))
    }

    /// Overflow event handler (also used to flush partial progress)
    ///
    /// Returns how many times the counter wrapped.
    pub fn on_overflow(&mut self, elapsed: Cycles) -> u64 {
        let steps = self.countdown.advance(elapsed);
        self.count(steps)
    }

    /// Count-up input from the timer below; returns the wraps produced
    pub fn count(&mut self, steps: u64) -> u64 {
        let total = u64::from(self.counter) + steps;
        if total < 0x10000 {
            self.counter = total as u16;
            return 0;
        }

        let span = 0x10000 - u64::from(self.reload);
        let past = total - 0x10000;
        self.counter = (u64::from(self.reload) + past % span) as u16;
        1 + past / span
    }

    pub fn write_reload(&mut self, value: u16) {
        self.reload = value;
    }

    /// Control write; any pending event must already be flushed
    pub fn write_control(&mut self, value: u16) {
        let starting = !self.is_enabled() && value & CONTROL_ENABLE != 0;
        self.control = value & 0x00C7;
        self.countdown
            .set_period(PRESCALERS[usize::from(value & 0x03)]);

        if starting {
            self.counter = self.reload;
            self.countdown.restart();
        }
    }
}
