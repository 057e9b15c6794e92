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

//! Audio interface
//!
//! The DAC clock is the NTSC video clock divided by `AI_DACRATE + 1`. Every
//! sample is four bytes (16-bit stereo). Buffers queued through AI_LEN play
//! back to back from a two-entry FIFO; the head buffer's completion is a
//! one-shot event and raises the AI interrupt.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::{Countdown, Cycles};

/// NTSC video clock feeding the DAC divider
pub const VIDEO_CLOCK_HZ: u64 = 48_681_812;

/// CPU clock in Hz
pub const CPU_CLOCK_HZ: u64 = 93_750_000;

/// AI_DACRATE at power-on (roughly 44.1 kHz)
pub const DEFAULT_DAC_RATE: u32 = 1_103;

/// Bytes per stereo sample
pub const BYTES_PER_SAMPLE: u32 = 4;

const FIFO_DEPTH: usize = 2;

/// CPU cycles per DAC sample for a given AI_DACRATE
pub fn sample_period(dac_rate: u32) -> Cycles {
    (CPU_CLOCK_HZ * (u64::from(dac_rate) + 1) / VIDEO_CLOCK_HZ).max(1)
}

/// Audio interface registers and buffer FIFO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct AudioInterface {
    dram_address: u32,

    /// Byte lengths of queued buffers; the first one is playing
    fifo: Vec<u32>,

    /// Delay the head buffer's completion event was armed with
    armed: Cycles,

    dma_enabled: bool,
    dac_rate: u32,
    bit_rate: u32,

    sampler: Countdown,

    /// DAC samples clocked out since power-on
    samples: u64,

    /// Buffers played to completion
    buffers_played: u64,
}

impl AudioInterface {
    pub fn new() -> Self {
        Self {
            dram_address: 0,
            fifo: Vec::with_capacity(FIFO_DEPTH),
            armed: 0,
            dma_enabled: false,
            dac_rate: DEFAULT_DAC_RATE,
            bit_rate: 0,
            sampler: Countdown::new(sample_period(DEFAULT_DAC_RATE), 1),
            samples: 0,
            buffers_played: 0,
        }
    }

    #[inline]
    pub fn dram_address(&self) -> u32 {
        self.dram_address
    }

    #[inline]
    pub fn dac_rate(&self) -> u32 {
        self.dac_rate
    }

    #[inline]
    pub fn bit_rate(&self) -> u32 {
        self.bit_rate
    }

    #[inline]
    pub fn is_dma_enabled(&self) -> bool {
        self.dma_enabled
    }

    /// Buffers waiting or playing
    #[inline]
    pub fn depth(&self) -> usize {
        self.fifo.len()
    }

    /// Whether a buffer is playing
    #[inline]
    pub fn is_busy(&self) -> bool {
        !self.fifo.is_empty()
    }

    #[inline]
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    #[inline]
    pub fn buffers_played(&self) -> u64 {
        self.buffers_played
    }

    #[inline]
    pub fn period(&self) -> Cycles {
        self.sampler.period()
    }

    /// AI_STATUS: bit 31 FIFO full, bit 30 busy, bit 25 DMA enabled
    pub fn status(&self) -> u32 {
        u32::from(self.fifo.len() >= FIFO_DEPTH) << 31
            | u32::from(self.is_busy()) << 30
            | u32::from(self.dma_enabled) << 25
    }

    /// AI_LEN: bytes left in the playing buffer
    ///
    /// `remaining` is the time left on the buffer's completion event.
    pub fn remaining_bytes(&self, remaining: Option<Cycles>) -> u32 {
        match (self.fifo.first(), remaining) {
            (Some(&length), Some(remaining)) => {
                let samples = remaining.div_ceil(self.period());
                (samples * u64::from(BYTES_PER_SAMPLE)).min(u64::from(length)) as u32
            }
            _ => 0,
        }
    }

    /// Play time of a buffer of `length` bytes at the current rate
    pub fn buffer_duration(&self, length: u32) -> Cycles {
        let samples = u64::from(length / BYTES_PER_SAMPLE);
        (samples * self.period()).max(1)
    }

    pub fn write_dram_address(&mut self, value: u32) {
        self.dram_address = value & 0x00FF_FFF8;
    }

    /// AI_LEN write
    ///
    /// Returns the play time when the buffer starts immediately. Writes while
    /// the FIFO is full or DMA is disabled are dropped.
    pub fn queue(&mut self, value: u32) -> Option<Cycles> {
        let length = value & 0x0003_FFF8;
        if length == 0 || !self.dma_enabled || self.fifo.len() >= FIFO_DEPTH {
            log::debug!("AI: dropped {length}-byte buffer (depth {})", self.fifo.len());
            return None;
        }

        self.fifo.push(length);
        if self.fifo.len() > 1 {
            return None;
        }
        self.armed = self.buffer_duration(length);
        Some(self.armed)
    }

    pub fn write_control(&mut self, value: u32) {
        self.dma_enabled = value & 1 != 0;
    }

    /// AI_DACRATE write; the sample event must already be flushed
    pub fn write_dac_rate(&mut self, value: u32) {
        self.dac_rate = value & 0x3FFF;
        self.sampler.set_period(sample_period(self.dac_rate));
    }

    pub fn write_bit_rate(&mut self, value: u32) {
        self.bit_rate = value & 0x0F;
    }

    #[inline]
    pub fn next_sample_delay(&self) -> Cycles {
        self.sampler.delay_for(1)
    }

    /// Sample clock handler
    pub fn on_sample(&mut self, elapsed: Cycles) -> Cycles {
        self.samples += self.sampler.advance(elapsed);
        self.next_sample_delay()
    }

    /// Head buffer completion handler
    ///
    /// `elapsed` counts from when the completion event was armed. Cycles past
    /// the buffer's end already belong to the next buffer, so they are taken
    /// off its play time; buffers overtaken entirely finish here too.
    /// Returns the delay to the next completion, if a buffer is still queued.
    pub fn on_buffer_done(&mut self, elapsed: Cycles) -> Option<Cycles> {
        let mut overshoot = elapsed.saturating_sub(self.armed);
        while !self.fifo.is_empty() {
            self.fifo.remove(0);
            self.buffers_played += 1;

            let &next = self.fifo.first()?;
            let duration = self.buffer_duration(next);
            if duration > overshoot {
                self.armed = duration - overshoot;
                return Some(self.armed);
            }
            overshoot -= duration;
        }
        None
    }
}

impl Default for AudioInterface {
    fn default() -> Self {
        Self::new()
    }
}
