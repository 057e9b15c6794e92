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

//! Divider and interval timer
//!
//! ## Registers
//!
//! - **DIV** (0xFF04): upper byte of a 16-bit counter clocked every T-cycle;
//!   any write clears it
//! - **TIMA** (0xFF05): counter incremented at the TAC rate
//! - **TMA** (0xFF06): value loaded into TIMA after an overflow
//! - **TAC** (0xFF07): bit 2 enable, bits 0-1 clock select
//!
//! ```text
//! TAC | Rate       | T-cycles per increment
//! ----|------------|-----------------------
//! 00  | 4096 Hz    | 1024
//! 01  | 262144 Hz  | 16
//! 10  | 65536 Hz   | 64
//! 11  | 16384 Hz   | 256
//! ```
//!
//! TIMA is not stepped cycle by cycle. The overflow event is armed for the
//! moment TIMA would wrap, and reads in between derive the live value from
//! the time elapsed since the event was armed.
//!
//! On overflow TIMA reads 0 for one M-cycle, then TMA is loaded and the
//! interrupt is requested. Writing TIMA inside that window cancels both.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::{Countdown, Cycles};

/// T-cycles between TIMA overflow and the TMA reload
pub const RELOAD_DELAY: Cycles = 4;

/// What the overflow event handler wants scheduled next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStep {
    /// TIMA has not wrapped yet; re-arm the overflow event
    Rearm(Cycles),
    /// TIMA wrapped; schedule the reload after this many ticks
    Reload(Cycles),
    /// The reload window already passed: TMA is loaded, request the
    /// interrupt and re-arm the overflow event
    Reloaded(Cycles),
}

/// DIV/TIMA/TMA/TAC block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Timer {
    /// Internal 16-bit divider
    div: u16,

    /// Converts time base ticks into divider T-cycles
    div_clock: Countdown,

    tima: u8,
    tma: u8,
    tac: u8,

    /// TIMA increment countdown
    countdown: Countdown,

    /// Between overflow and reload
    reloading: bool,
}

impl Timer {
    /// Create a stopped timer
    ///
    /// * `unit` - Time base ticks per T-cycle
    pub fn new(unit: Cycles) -> Self {
        Self {
            div: 0,
            div_clock: Countdown::new(1, unit),
            tima: 0,
            tma: 0,
            tac: 0,
            countdown: Countdown::new(1024, unit),
            reloading: false,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    #[inline]
    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// T-cycles per TIMA increment for the current TAC
    pub fn divider(&self) -> Cycles {
        match self.tac & 0x03 {
            0 => 1024,
            1 => 16,
            2 => 64,
            _ => 256,
        }
    }

    /// DIV register
    #[inline]
    pub fn div(&self) -> u8 {
        (self.div >> 8) as u8
    }

    #[inline]
    pub fn tma(&self) -> u8 {
        self.tma
    }

    #[inline]
    pub fn tac(&self) -> u8 {
        self.tac | 0xF8
    }

    /// TIMA as the CPU would read it
    ///
    /// `elapsed` is the time since the overflow event was armed, if it is
    /// pending.
    pub fn tima(&self, elapsed: Option<Cycles>) -> u8 {
        match elapsed {
            Some(elapsed) => (u64::from(self.tima) + self.countdown.peek(elapsed)).min(0xFF) as u8,
            None => self.tima,
        }
    }

    /// Advance the divider by `ticks` time base ticks
    pub fn clock_div(&mut self, ticks: Cycles) {
        let cycles = self.div_clock.advance(ticks);
        self.div = self.div.wrapping_add(cycles as u16);
    }

    /// Delay until TIMA next wraps
    #[inline]
    pub fn overflow_delay(&self) -> Cycles {
        self.countdown.delay_for(0x100 - u64::from(self.tima))
    }

    /// Overflow event handler (also used to flush partial progress)
    pub fn on_overflow(&mut self, elapsed: Cycles) -> TimerStep {
        let total = u64::from(self.tima) + self.countdown.advance(elapsed);
        self.settle(total)
    }

    /// Reload event handler
    ///
    /// Loads TMA and returns what to schedule next if the timer is still
    /// enabled. The caller requests the interrupt.
    pub fn on_reload(&mut self, elapsed: Cycles) -> Option<TimerStep> {
        let steps = self.countdown.advance(elapsed);
        self.reloading = false;

        if !self.is_enabled() {
            self.tima = (u64::from(self.tma) + steps).min(0xFF) as u8;
            return None;
        }
        Some(self.settle(u64::from(self.tma) + steps))
    }

    /// Store a TIMA value that may have wrapped any number of times
    fn settle(&mut self, mut total: u64) -> TimerStep {
        let window = RELOAD_DELAY * self.countdown.unit();
        let mut reloaded = false;

        loop {
            if total < 0x100 {
                self.tima = total as u8;
                let delay = self.countdown.delay_for(0x100 - total);
                return if reloaded {
                    TimerStep::Reloaded(delay)
                } else {
                    TimerStep::Rearm(delay)
                };
            }

            // Ticks since the wrap actually happened
            let late = (total - 0x100) * self.countdown.period_ticks() + self.countdown.residual();
            if late < window {
                self.tima = 0;
                self.reloading = true;
                return TimerStep::Reload(window - late);
            }

            // Increments after the wrap land on top of TMA
            reloaded = true;
            total = u64::from(self.tma) + (total - 0x100);
        }
    }

    /// TIMA write; any pending reload must already be cancelled
    pub fn write_tima(&mut self, value: u8) {
        self.tima = value;
        self.reloading = false;
    }

    pub fn write_tma(&mut self, value: u8) {
        self.tma = value;
    }

    /// TAC write; the overflow event must already be flushed
    pub fn write_tac(&mut self, value: u8) {
        self.tac = value & 0x07;
        self.countdown.set_period(self.divider());
    }

    /// DIV write: clears the divider and the TIMA prescaler
    pub fn reset_div(&mut self) {
        self.div = 0;
        self.div_clock.restart();
        self.countdown.restart();
    }

    /// Change the time base ticks per T-cycle
    pub fn set_unit(&mut self, unit: Cycles) {
        self.div_clock.set_unit(unit);
        self.countdown.set_unit(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divider_table() {
        let mut timer = Timer::new(2);
        for (tac, divider) in [(0x04, 1024), (0x05, 16), (0x06, 64), (0x07, 256)] {
            timer.write_tac(tac);
            assert_eq!(timer.divider(), divider);
        }
    }

    #[test]
    fn test_div_counts_t_cycles() {
        let mut timer = Timer::new(2);
        timer.clock_div(2 * 256 + 1);
        assert_eq!(timer.div(), 1);
        timer.clock_div(1);
        timer.clock_div(2 * 255);
        assert_eq!(timer.div(), 2);
    }

    #[test]
    fn test_in_flight_readback() {
        let mut timer = Timer::new(2);
        timer.write_tac(0x05);
        timer.write_tima(0xF0);
        assert_eq!(timer.overflow_delay(), 16 * 2 * 16);

        assert_eq!(timer.tima(Some(0)), 0xF0);
        assert_eq!(timer.tima(Some(16 * 2 * 3 + 5)), 0xF3);
        assert_eq!(timer.tima(None), 0xF0);
    }

    #[test]
    fn test_overflow_then_reload() {
        let mut timer = Timer::new(2);
        timer.write_tac(0x05);
        timer.write_tma(0x80);
        timer.write_tima(0xFF);

        let delay = timer.overflow_delay();
        assert_eq!(timer.on_overflow(delay), TimerStep::Reload(8));
        assert!(timer.is_reloading());
        assert_eq!(timer.tima(None), 0);

        let next = timer.on_reload(8);
        assert_eq!(timer.tima(None), 0x80);
        // Four T-cycles of the new period already went by
        assert_eq!(next, Some(TimerStep::Rearm(0x80 * 32 - 8)));
    }

    #[test]
    fn test_late_overflow_shortens_reload_window() {
        let mut timer = Timer::new(2);
        timer.write_tac(0x05);
        timer.write_tima(0xFF);
        assert_eq!(timer.on_overflow(32 + 6), TimerStep::Reload(2));
    }

    #[test]
    fn test_overflow_past_the_reload_window_reloads_inline() {
        let mut timer = Timer::new(2);
        timer.write_tac(0x05);
        timer.write_tma(0x80);
        timer.write_tima(0xFF);

        // Wrap at 32, reload at 40, three more increments by 136
        assert_eq!(timer.on_overflow(136), TimerStep::Reloaded(0x7D * 32 - 8));
        assert!(!timer.is_reloading());
        assert_eq!(timer.tima(None), 0x83);
    }

    #[test]
    fn test_late_reload_wraps_again() {
        let mut timer = Timer::new(2);
        timer.write_tac(0x05);
        timer.write_tma(0xFE);
        timer.write_tima(0xFF);
        assert_eq!(timer.on_overflow(32), TimerStep::Reload(8));

        // Reload at 40, wrap again at 96, second reload due at 104
        assert_eq!(timer.on_reload(70), Some(TimerStep::Reload(2)));
        assert!(timer.is_reloading());
        assert_eq!(timer.tima(None), 0);
    }

    #[test]
    fn test_partial_flush_rearms_for_remaining() {
        let mut timer = Timer::new(1);
        timer.write_tac(0x04);
        timer.write_tima(0xFE);
        assert_eq!(timer.on_overflow(1500), TimerStep::Rearm(548));
        assert_eq!(timer.tima(None), 0xFF);
    }
}
