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

//! CP0 COUNT/COMPARE timer
//!
//! COUNT increments every other CPU cycle and raises IP7 when it equals
//! COMPARE. The register is never stepped: the compare event stays armed for
//! the moment of the next match and COUNT is derived from the time elapsed
//! since the event was inserted. Any COUNT or COMPARE write must flush the
//! event first so the counted progress lands in the register.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::{Countdown, Cycles};

/// CPU cycles per COUNT increment
pub const COUNT_DIVIDER: Cycles = 2;

/// COUNT/COMPARE pair and the IP7 latch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct CompareTimer {
    /// COUNT as of the last flush
    count: u32,

    compare: u32,

    countdown: Countdown,

    /// Cause.IP7
    pending: bool,
}

impl CompareTimer {
    pub fn new() -> Self {
        Self {
            count: 0,
            compare: 0,
            countdown: Countdown::new(1, COUNT_DIVIDER),
            pending: false,
        }
    }

    /// COUNT as the CPU would read it
    ///
    /// `elapsed` is the time since the compare event was armed.
    pub fn count(&self, elapsed: Cycles) -> u32 {
        self.count
            .wrapping_add(self.countdown.peek(elapsed) as u32)
    }

    #[inline]
    pub fn compare(&self) -> u32 {
        self.compare
    }

    /// Whether IP7 is asserted
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Increments left until COUNT equals COMPARE (a full wrap when equal)
    fn increments_to_match(&self) -> u64 {
        match self.compare.wrapping_sub(self.count) {
            0 => 1 << 32,
            increments => u64::from(increments),
        }
    }

    /// Delay until the next match
    #[inline]
    pub fn match_delay(&self) -> Cycles {
        self.countdown.delay_for(self.increments_to_match())
    }

    /// Compare event handler (also used to flush partial progress)
    ///
    /// Returns the delay to the next match.
    pub fn on_event(&mut self, elapsed: Cycles) -> Cycles {
        let increments = self.countdown.advance(elapsed);
        if increments >= self.increments_to_match() {
            self.pending = true;
        }
        self.count = self.count.wrapping_add(increments as u32);
        self.match_delay()
    }

    /// COUNT write; the compare event must already be flushed
    pub fn write_count(&mut self, value: u32) {
        self.count = value;
    }

    /// COMPARE write; the compare event must already be flushed
    ///
    /// Acknowledges IP7.
    pub fn write_compare(&mut self, value: u32) {
        self.compare = value;
        self.pending = false;
    }
}

impl Default for CompareTimer {
    fn default() -> Self {
        Self::new()
    }
}
