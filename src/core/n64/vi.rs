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

//! Video interface timing
//!
//! The line event fires once per scan line. VI_CURRENT and VI_V_INTR are in
//! half-lines, so line `n` reads back as `2n` and the interrupt fires when
//! `2n` equals VI_V_INTR with its low bit cleared.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::{Countdown, Cycles};

/// CPU cycles per scan line (NTSC, 60 fields of 262 lines)
pub const CYCLES_PER_LINE: Cycles = 5_963;

/// VI_V_SYNC at power-on (NTSC, 525 half-lines)
pub const DEFAULT_V_SYNC: u32 = 0x20D;

/// VI_V_INTR at power-on; no half-line reaches it
pub const DEFAULT_V_INTR: u32 = 0x3FF;

/// Video interface line counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct VideoInterface {
    /// Current line of the field
    line: u32,

    v_sync: u32,
    v_intr: u32,

    countdown: Countdown,

    /// Completed fields
    frames: u64,
}

impl VideoInterface {
    pub fn new() -> Self {
        Self {
            line: 0,
            v_sync: DEFAULT_V_SYNC,
            v_intr: DEFAULT_V_INTR,
            countdown: Countdown::new(CYCLES_PER_LINE, 1),
            frames: 0,
        }
    }

    /// Lines per field for the current VI_V_SYNC
    #[inline]
    pub fn lines_per_field(&self) -> u32 {
        (self.v_sync / 2).max(1)
    }

    /// VI_CURRENT
    #[inline]
    pub fn current(&self) -> u32 {
        self.line << 1
    }

    #[inline]
    pub fn v_intr(&self) -> u32 {
        self.v_intr
    }

    #[inline]
    pub fn v_sync(&self) -> u32 {
        self.v_sync
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn write_v_intr(&mut self, value: u32) {
        self.v_intr = value & 0x3FF;
    }

    pub fn write_v_sync(&mut self, value: u32) {
        self.v_sync = value & 0x3FF;
        self.line %= self.lines_per_field();
    }

    #[inline]
    pub fn next_delay(&self) -> Cycles {
        self.countdown.delay_for(1)
    }

    /// Line event handler
    ///
    /// Returns the delay to the next line and whether the VI interrupt line
    /// was crossed.
    pub fn on_event(&mut self, elapsed: Cycles) -> (Cycles, bool) {
        let lines = self.countdown.advance(elapsed);
        let mut raised = false;

        for _ in 0..lines {
            self.line += 1;
            if self.line >= self.lines_per_field() {
                self.line = 0;
                self.frames += 1;
            }
            raised |= self.current() == self.v_intr & !1;
        }

        (self.next_delay(), raised)
    }
}

impl Default for VideoInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_length() {
        let mut vi = VideoInterface::new();
        assert_eq!(vi.lines_per_field(), 262);

        vi.on_event(CYCLES_PER_LINE * 261);
        assert_eq!(vi.current(), 522);
        assert_eq!(vi.frame_count(), 0);

        vi.on_event(CYCLES_PER_LINE);
        assert_eq!(vi.current(), 0);
        assert_eq!(vi.frame_count(), 1);
    }

    #[test]
    fn test_interrupt_on_matching_half_line() {
        let mut vi = VideoInterface::new();
        vi.write_v_intr(0x201);

        let (_, raised) = vi.on_event(CYCLES_PER_LINE * 255);
        assert!(!raised);
        let (delay, raised) = vi.on_event(CYCLES_PER_LINE + 10);
        assert!(raised);
        assert_eq!(vi.current(), 0x200);
        assert_eq!(delay, CYCLES_PER_LINE - 10);
    }

    #[test]
    fn test_default_v_intr_never_fires() {
        let mut vi = VideoInterface::new();
        let (_, raised) = vi.on_event(CYCLES_PER_LINE * 262 * 3);
        assert!(!raised);
        assert_eq!(vi.frame_count(), 3);
    }

    #[test]
    fn test_shorter_v_sync_wraps_line() {
        let mut vi = VideoInterface::new();
        vi.on_event(CYCLES_PER_LINE * 200);
        vi.write_v_sync(0x20C / 2);
        assert_eq!(vi.lines_per_field(), 131);
        assert_eq!(vi.current(), 2 * (200 % 131));
    }
}
