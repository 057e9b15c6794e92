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

//! Programmable sound generator channels
//!
//! The square, wave and noise channels shared by both handhelds. Only the
//! part that talks to the scheduler is modelled: each channel's period
//! countdown and the phase it advances. Envelope and sweep units are out of
//! scope; the channel volume is a plain register.
//!
//! Periods are expressed in PSG clock cycles (4.194304 MHz). The owning
//! machine supplies how many of its time base ticks make one PSG cycle.
//!
//! [`Psg`] bundles the four channels with the down-sample tick that mixes
//! them into the output buffer at [`SAMPLE_RATE`].

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::timing::{Countdown, Cycles};

/// Square wave duty patterns (12.5%, 25%, 50%, 75%)
const DUTY_TABLE: [u8; 4] = [0b0000_0001, 0b1000_0001, 0b1000_0111, 0b0111_1110];

/// Noise divisor codes in PSG cycles
const NOISE_DIVISORS: [Cycles; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

/// Output sample rate in Hz
pub const SAMPLE_RATE: u32 = 32_768;

/// Samples kept before the frontend drains the buffer
pub const SAMPLE_BUFFER_CAPACITY: usize = 8192;

/// Channel waveform generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Waveform {
    /// Eight-step duty cycle
    Square,
    /// 32 four-bit samples from wave RAM
    Wave,
    /// Linear feedback shift register
    Noise,
}

/// One sound channel's timing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PsgChannel {
    waveform: Waveform,

    /// Period countdown
    countdown: Countdown,

    /// Duty step (0-7) or wave sample index (0-31)
    position: u8,

    /// Duty pattern index (0-3)
    duty: u8,

    /// Noise shift register
    lfsr: u16,

    /// 7-bit noise mode
    narrow: bool,

    /// Output volume (0-15)
    volume: u8,

    /// Wave RAM samples (4-bit)
    wave: [u8; 32],

    enabled: bool,
}

/// Outcome of a channel period event
pub type Rearm = Option<Cycles>;

impl PsgChannel {
    /// Create a silent channel
    ///
    /// # Arguments
    ///
    /// * `waveform` - Generator type
    /// * `unit` - Time base ticks per PSG clock cycle
    pub fn new(waveform: Waveform, unit: Cycles) -> Self {
        let mut channel = Self {
            waveform,
            countdown: Countdown::new(1, unit),
            position: 0,
            duty: 2,
            lfsr: 0x7FFF,
            narrow: false,
            volume: 0,
            wave: [0; 32],
            enabled: false,
        };
        match waveform {
            Waveform::Noise => channel.set_noise(0, 0, false),
            _ => channel.set_frequency(0),
        }
        channel
    }

    #[inline]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current duty step or wave sample index
    #[inline]
    pub fn position(&self) -> u8 {
        self.position
    }

    #[inline]
    pub fn lfsr(&self) -> u16 {
        self.lfsr
    }

    /// Period in time base ticks
    #[inline]
    pub fn period_ticks(&self) -> Cycles {
        self.countdown.period_ticks()
    }

    /// Set the 11-bit frequency register of a square or wave channel
    pub fn set_frequency(&mut self, frequency: u16) {
        let steps = 2048 - Cycles::from(frequency & 0x7FF);
        let period = match self.waveform {
            Waveform::Square => steps * 4,
            Waveform::Wave => steps * 2,
            Waveform::Noise => return,
        };
        self.countdown.set_period(period);
    }

    /// Configure the noise clock: divisor code, shift and width
    pub fn set_noise(&mut self, divisor_code: u8, shift: u8, narrow: bool) {
        let divisor = NOISE_DIVISORS[usize::from(divisor_code & 7)];
        self.countdown.set_period(divisor << (shift & 0x0F));
        self.narrow = narrow;
    }

    pub fn set_duty(&mut self, duty: u8) {
        self.duty = duty & 3;
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume & 0x0F;
    }

    /// Load wave RAM (16 bytes, two samples per byte, high nibble first)
    pub fn load_wave(&mut self, bytes: &[u8; 16]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.wave[i * 2] = byte >> 4;
            self.wave[i * 2 + 1] = byte & 0x0F;
        }
    }

    /// Change the time base ticks per PSG cycle
    pub fn set_unit(&mut self, unit: Cycles) {
        self.countdown.set_unit(unit);
    }

    /// Start the channel, returning the delay of its first period event
    pub fn trigger(&mut self) -> Cycles {
        self.enabled = true;
        self.countdown.restart();
        match self.waveform {
            Waveform::Square => {}
            Waveform::Wave => self.position = 0,
            Waveform::Noise => self.lfsr = 0x7FFF,
        }
        self.countdown.delay_for(1)
    }

    /// Delay until the next period event from the current progress
    #[inline]
    pub fn next_delay(&self) -> Cycles {
        self.countdown.delay_for(1)
    }

    /// Stop the channel; the caller removes its pending event
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Period event handler
    ///
    /// Advances the phase by every period completed in `elapsed` and returns
    /// the next delay while the channel is still enabled.
    pub fn on_period(&mut self, elapsed: Cycles) -> Rearm {
        let steps = self.countdown.advance(elapsed);

        match self.waveform {
            Waveform::Square => self.position = ((u64::from(self.position) + steps) % 8) as u8,
            Waveform::Wave => self.position = ((u64::from(self.position) + steps) % 32) as u8,
            Waveform::Noise => {
                let cycle = if self.narrow { 127 } else { 32_767 };
                for _ in 0..steps % cycle {
                    self.clock_lfsr();
                }
            }
        }

        self.enabled.then(|| self.countdown.delay_for(1))
    }

    /// Current output level (0-15)
    pub fn output(&self) -> u8 {
        if !self.enabled {
            return 0;
        }

        match self.waveform {
            Waveform::Square => {
                let high = (DUTY_TABLE[usize::from(self.duty)] >> (7 - self.position)) & 1;
                high * self.volume
            }
            Waveform::Wave => self.wave[usize::from(self.position)] * self.volume / 15,
            Waveform::Noise => {
                if self.lfsr & 1 == 0 {
                    self.volume
                } else {
                    0
                }
            }
        }
    }

    fn clock_lfsr(&mut self) {
        let bit = (self.lfsr ^ (self.lfsr >> 1)) & 1;
        self.lfsr = (self.lfsr >> 1) | (bit << 14);
        if self.narrow {
            self.lfsr = (self.lfsr & !(1 << 6)) | (bit << 6);
        }
    }
}

/// Four PSG channels and the mixer's sample tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Psg {
    channels: [PsgChannel; 4],

    /// Down-sample countdown, one period per output sample
    sampler: Countdown,
}

impl Psg {
    /// Create the standard bank: two squares, wave, noise
    ///
    /// # Arguments
    ///
    /// * `unit` - Time base ticks per PSG clock cycle
    /// * `sample_period` - Time base ticks per output sample
    pub fn new(unit: Cycles, sample_period: Cycles) -> Self {
        Self {
            channels: [
                PsgChannel::new(Waveform::Square, unit),
                PsgChannel::new(Waveform::Square, unit),
                PsgChannel::new(Waveform::Wave, unit),
                PsgChannel::new(Waveform::Noise, unit),
            ],
            sampler: Countdown::new(sample_period, 1),
        }
    }

    /// Channel `index` (0-3)
    #[inline]
    pub fn channel(&self, index: usize) -> &PsgChannel {
        &self.channels[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut PsgChannel {
        &mut self.channels[index]
    }

    /// Delay until the next output sample
    #[inline]
    pub fn next_sample_delay(&self) -> Cycles {
        self.sampler.delay_for(1)
    }

    /// Current mix of all four channels as a signed sample
    pub fn mix(&self) -> i16 {
        let sum: i16 = self.channels.iter().map(|c| i16::from(c.output())).sum();
        (sum - 30) * 512
    }

    /// Sample tick handler
    ///
    /// Appends one sample per elapsed sample period to `out` (dropping
    /// samples once the buffer is full) and returns the next delay.
    pub fn on_sample(&mut self, elapsed: Cycles, out: &mut Vec<i16>) -> Cycles {
        let due = self.sampler.advance(elapsed);
        let level = self.mix();
        let room = SAMPLE_BUFFER_CAPACITY.saturating_sub(out.len());
        let count = usize::try_from(due).unwrap_or(usize::MAX).min(room);
        out.extend(std::iter::repeat_n(level, count));
        self.sampler.delay_for(1)
    }
}
