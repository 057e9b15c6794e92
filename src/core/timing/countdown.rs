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

//! Periodic countdown bookkeeping shared by re-arming clients
//!
//! A client that fires every `period` of its own clock keeps a [`Countdown`].
//! When its event fires (or is flushed early) the handler passes the elapsed
//! time base cycles to [`Countdown::advance`], which reports how many whole
//! periods completed and keeps the leftover. [`Countdown::delay_for`] then
//! gives the insertion delay for the next event, so late dispatch and early
//! flushes never lose or gain a cycle.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::Cycles;

/// Progress through a periodic countdown
///
/// # Example
///
/// ```
/// use retrocore::core::timing::Countdown;
///
/// // A 16-cycle period on a clock that runs at half the time base rate
/// let mut countdown = Countdown::new(16, 2);
/// assert_eq!(countdown.delay_for(1), 32);
///
/// // Dispatched 4 ticks late
/// assert_eq!(countdown.advance(36), 1);
/// assert_eq!(countdown.delay_for(1), 28);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Countdown {
    /// Period length in client clock cycles
    period: Cycles,

    /// Time base ticks per client clock cycle
    unit: Cycles,

    /// Time base ticks accrued towards the current period
    residual: Cycles,
}

impl Countdown {
    /// Create a countdown with no progress
    pub fn new(period: Cycles, unit: Cycles) -> Self {
        assert!(period > 0 && unit > 0, "countdown period and unit must be non-zero");
        Self {
            period,
            unit,
            residual: 0,
        }
    }

    /// Period in client clock cycles
    #[inline]
    pub fn period(&self) -> Cycles {
        self.period
    }

    /// Time base ticks per client clock cycle
    #[inline]
    pub fn unit(&self) -> Cycles {
        self.unit
    }

    /// Period length in time base ticks
    #[inline]
    pub fn period_ticks(&self) -> Cycles {
        self.period * self.unit
    }

    /// Time base ticks accrued towards the current period
    #[inline]
    pub fn residual(&self) -> Cycles {
        self.residual
    }

    /// Account for `elapsed` time base ticks, returning completed periods
    pub fn advance(&mut self, elapsed: Cycles) -> u64 {
        let total = self.residual + elapsed;
        let period = self.period_ticks();
        self.residual = total % period;
        total / period
    }

    /// Whole periods that `elapsed` more ticks would complete, without
    /// consuming them
    #[inline]
    pub fn peek(&self, elapsed: Cycles) -> u64 {
        (self.residual + elapsed) / self.period_ticks()
    }

    /// Time base ticks until `steps` more periods have completed
    #[inline]
    pub fn delay_for(&self, steps: u64) -> Cycles {
        debug_assert!(steps > 0, "a countdown cannot be armed for zero periods");
        steps * self.period_ticks() - self.residual
    }

    /// Change the period, keeping progress inside the new period
    pub fn set_period(&mut self, period: Cycles) {
        assert!(period > 0, "countdown period must be non-zero");
        self.period = period;
        self.residual %= self.period_ticks();
    }

    /// Change the clock rate, rescaling progress to the new tick length
    pub fn set_unit(&mut self, unit: Cycles) {
        assert!(unit > 0, "countdown unit must be non-zero");
        self.residual = self.residual * unit / self.unit;
        self.unit = unit;
    }

    /// Discard progress towards the current period
    #[inline]
    pub fn restart(&mut self) {
        self.residual = 0;
    }
}
