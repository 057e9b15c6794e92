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

//! 64-bit home console (Nintendo 64)
//!
//! The time base is the 93.75 MHz CPU clock. CP0 COUNT runs at half that,
//! so [`EventDispatch::skip_to_event`] moves in steps of two cycles.
//!
//! Covered here are the RCP interfaces with timed behaviour: VI line
//! timing, the AI sample clock and buffer FIFO, PI/SI/SP DMA completion and
//! the MI interrupt lines they feed, plus the CP0 compare timer.

pub mod ai;
pub mod cp0;
pub mod dma;
pub mod event;
pub mod interrupt;
pub mod vi;

#[cfg(test)]
mod tests;

pub use ai::AudioInterface;
pub use cp0::CompareTimer;
pub use dma::{DmaBus, DmaEngine};
pub use event::N64Event;
pub use interrupt::MiInterrupts;
pub use vi::VideoInterface;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::error::SaveStateError;
use super::timing::{Cycles, EventDispatch, Handler, Scheduler, SchedulerState, Timestamp};

/// CPU clock in Hz
pub const CLOCK_HZ: u64 = ai::CPU_CLOCK_HZ;

pub const SP_MEM_ADDR: u32 = 0x0404_0000;
pub const SP_DRAM_ADDR: u32 = 0x0404_0004;
pub const SP_RD_LEN: u32 = 0x0404_0008;
pub const SP_WR_LEN: u32 = 0x0404_000C;
pub const SP_STATUS: u32 = 0x0404_0010;
pub const SP_DMA_BUSY: u32 = 0x0404_0018;

pub const MI_INTR: u32 = 0x0430_0008;
pub const MI_INTR_MASK: u32 = 0x0430_000C;

pub const VI_V_INTR: u32 = 0x0440_000C;
pub const VI_V_CURRENT: u32 = 0x0440_0010;
pub const VI_V_SYNC: u32 = 0x0440_0018;

pub const AI_DRAM_ADDR: u32 = 0x0450_0000;
pub const AI_LEN: u32 = 0x0450_0004;
pub const AI_CONTROL: u32 = 0x0450_0008;
pub const AI_STATUS: u32 = 0x0450_000C;
pub const AI_DACRATE: u32 = 0x0450_0010;
pub const AI_BITRATE: u32 = 0x0450_0014;

pub const PI_DRAM_ADDR: u32 = 0x0460_0000;
pub const PI_CART_ADDR: u32 = 0x0460_0004;
pub const PI_RD_LEN: u32 = 0x0460_0008;
pub const PI_WR_LEN: u32 = 0x0460_000C;
pub const PI_STATUS: u32 = 0x0460_0010;

pub const SI_DRAM_ADDR: u32 = 0x0480_0000;
pub const SI_PIF_AD_RD64B: u32 = 0x0480_0004;
pub const SI_PIF_AD_WR64B: u32 = 0x0480_0010;
pub const SI_STATUS: u32 = 0x0480_0018;

/// Bytes per SI DMA
const PIF_BLOCK: u32 = 64;

/// Nintendo 64 system timing model
#[derive(Debug, Clone)]
pub struct N64System {
    scheduler: Scheduler<N64Event>,

    vi: VideoInterface,
    ai: AudioInterface,
    cp0: CompareTimer,
    pi: DmaEngine,
    si: DmaEngine,
    sp: DmaEngine,

    mi_intr: MiInterrupts,
    mi_mask: MiInterrupts,
}

impl N64System {
    pub fn new() -> Self {
        let mut n64 = Self {
            scheduler: Scheduler::new(),
            vi: VideoInterface::new(),
            ai: AudioInterface::new(),
            cp0: CompareTimer::new(),
            pi: DmaEngine::new(DmaBus::Pi),
            si: DmaEngine::new(DmaBus::Si),
            sp: DmaEngine::new(DmaBus::Sp),
            mi_intr: MiInterrupts::empty(),
            mi_mask: MiInterrupts::empty(),
        };
        n64.scheduler.schedule(N64Event::Vi, n64.vi.next_delay());
        n64.scheduler
            .schedule(N64Event::AiSample, n64.ai.next_sample_delay());
        n64.scheduler
            .schedule(N64Event::CompareTimer, n64.cp0.match_delay());
        n64
    }

    pub fn reset(&mut self) {
        *self = Self::new();
        log::info!("N64: reset");
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.vi.frame_count()
    }

    #[inline]
    pub fn vi(&self) -> &VideoInterface {
        &self.vi
    }

    #[inline]
    pub fn ai(&self) -> &AudioInterface {
        &self.ai
    }

    #[inline]
    pub fn dma(&self, bus: DmaBus) -> &DmaEngine {
        match bus {
            DmaBus::Pi => &self.pi,
            DmaBus::Si => &self.si,
            DmaBus::Sp => &self.sp,
        }
    }

    /// MI lines both raised and unmasked
    #[inline]
    pub fn mi_pending(&self) -> MiInterrupts {
        self.mi_intr & self.mi_mask
    }

    /// Cause.IP bits driven by the hardware (IP2 from MI, IP7 from COMPARE)
    pub fn cause_ip(&self) -> u8 {
        u8::from(!self.mi_pending().is_empty()) << 2 | u8::from(self.cp0.is_pending()) << 7
    }

    /// Whether any hardware interrupt line is asserted
    #[inline]
    pub fn interrupt_pending(&self) -> bool {
        self.cause_ip() != 0
    }

    /// CP0 COUNT
    pub fn cop0_count(&self) -> u32 {
        let elapsed = self.scheduler.elapsed(N64Event::CompareTimer).unwrap_or(0);
        self.cp0.count(elapsed)
    }

    #[inline]
    pub fn cop0_compare(&self) -> u32 {
        self.cp0.compare()
    }

    /// MTC0 to COUNT
    pub fn write_cop0_count(&mut self, value: u32) {
        self.remove_and_flush(N64Event::CompareTimer);
        self.cp0.write_count(value);
        self.arm_compare();
    }

    /// MTC0 to COMPARE; also acknowledges IP7
    pub fn write_cop0_compare(&mut self, value: u32) {
        self.remove_and_flush(N64Event::CompareTimer);
        self.cp0.write_compare(value);
        self.arm_compare();
    }

    fn arm_compare(&mut self) {
        self.scheduler
            .schedule(N64Event::CompareTimer, self.cp0.match_delay());
    }

    /// Read a 32-bit RCP register
    pub fn read_register(&self, address: u32) -> u32 {
        match address {
            SP_STATUS => u32::from(self.sp.is_busy()) << 2,
            SP_DMA_BUSY => u32::from(self.sp.is_busy()),
            MI_INTR => self.mi_intr.bits(),
            MI_INTR_MASK => self.mi_mask.bits(),
            VI_V_INTR => self.vi.v_intr(),
            VI_V_CURRENT => self.vi.current(),
            VI_V_SYNC => self.vi.v_sync(),
            AI_LEN => self
                .ai
                .remaining_bytes(self.scheduler.remaining(N64Event::AiDma)),
            AI_STATUS => self.ai.status(),
            PI_DRAM_ADDR => self.pi.dram_address(),
            PI_CART_ADDR => self.pi.device_address(),
            PI_STATUS => {
                u32::from(self.pi.is_busy()) | u32::from(self.mi_intr.contains(MiInterrupts::PI)) << 3
            }
            SI_DRAM_ADDR => self.si.dram_address(),
            SI_STATUS => {
                u32::from(self.si.is_busy())
                    | u32::from(self.mi_intr.contains(MiInterrupts::SI)) << 12
            }
            _ => 0,
        }
    }

    /// Write a 32-bit RCP register
    pub fn write_register(&mut self, address: u32, value: u32) {
        match address {
            SP_MEM_ADDR => self.sp.write_device_address(value),
            SP_DRAM_ADDR => self.sp.write_dram_address(value),
            SP_RD_LEN | SP_WR_LEN => {
                let row = ((value & 0xFFF) | 7) + 1;
                let count = ((value >> 12) & 0xFF) + 1;
                self.start_dma(N64Event::SpDma, row * count);
            }
            MI_INTR_MASK => self.mi_mask = self.mi_mask.apply_mask_write(value),
            VI_V_INTR => self.vi.write_v_intr(value),
            VI_V_CURRENT => self.mi_intr.remove(MiInterrupts::VI),
            VI_V_SYNC => self.vi.write_v_sync(value),
            AI_DRAM_ADDR => self.ai.write_dram_address(value),
            AI_LEN => {
                if let Some(duration) = self.ai.queue(value) {
                    self.scheduler.schedule(N64Event::AiDma, duration);
                }
            }
            AI_CONTROL => self.ai.write_control(value),
            AI_STATUS => self.mi_intr.remove(MiInterrupts::AI),
            AI_DACRATE => {
                self.remove_and_flush(N64Event::AiSample);
                self.ai.write_dac_rate(value);
                self.scheduler
                    .schedule(N64Event::AiSample, self.ai.next_sample_delay());
            }
            AI_BITRATE => self.ai.write_bit_rate(value),
            PI_DRAM_ADDR => self.pi.write_dram_address(value),
            PI_CART_ADDR => self.pi.write_device_address(value),
            PI_RD_LEN | PI_WR_LEN => self.start_dma(N64Event::PiDma, (value & 0x00FF_FFFF) + 1),
            PI_STATUS => {
                if value & 0x02 != 0 {
                    self.mi_intr.remove(MiInterrupts::PI);
                }
            }
            SI_DRAM_ADDR => self.si.write_dram_address(value),
            SI_PIF_AD_RD64B | SI_PIF_AD_WR64B => {
                self.si.write_device_address(value);
                self.start_dma(N64Event::SiDma, PIF_BLOCK);
            }
            SI_STATUS => self.mi_intr.remove(MiInterrupts::SI),
            _ => log::trace!("N64: ignored write {value:#010X} to {address:#010X}"),
        }
    }

    fn start_dma(&mut self, kind: N64Event, length: u32) {
        let engine = match kind {
            N64Event::PiDma => &mut self.pi,
            N64Event::SiDma => &mut self.si,
            _ => &mut self.sp,
        };
        if let Some(duration) = engine.start(length) {
            self.scheduler.schedule(kind, duration);
        }
    }

    /// Skip ahead event by event until an interrupt line is asserted,
    /// giving up after `limit` cycles
    pub fn halt_until_interrupt(&mut self, limit: Cycles) -> Cycles {
        let mut skipped = 0;
        while !self.interrupt_pending() && skipped < limit {
            match self.skip_to_event() {
                Some(cycles) => skipped += cycles,
                None => break,
            }
        }
        skipped
    }

    /// Run until the VI starts the next field
    pub fn run_frame(&mut self) -> Cycles {
        let target = self.vi.frame_count() + 1;
        let mut elapsed = 0;
        while self.vi.frame_count() < target {
            match self.skip_to_event() {
                Some(cycles) => elapsed += cycles,
                None => break,
            }
        }
        elapsed
    }

    pub fn to_state(&self) -> N64State {
        N64State {
            scheduler: self.scheduler.to_state(),
            vi: self.vi.clone(),
            ai: self.ai.clone(),
            cp0: self.cp0.clone(),
            pi: self.pi.clone(),
            si: self.si.clone(),
            sp: self.sp.clone(),
            mi_intr: self.mi_intr.bits(),
            mi_mask: self.mi_mask.bits(),
        }
    }

    /// Rebuild from a save state, rejecting inconsistent data
    pub fn from_state(state: &N64State) -> Result<Self, SaveStateError> {
        let scheduler = Scheduler::from_state(&state.scheduler)?;
        scheduler.require_pending(Self::ALWAYS_PENDING)?;

        let mi_intr = MiInterrupts::from_bits(state.mi_intr)
            .ok_or_else(|| SaveStateError::component("mi", "invalid MI_INTR"))?;
        let mi_mask = MiInterrupts::from_bits(state.mi_mask)
            .ok_or_else(|| SaveStateError::component("mi", "invalid MI_INTR_MASK"))?;

        if state.vi.current() >> 1 >= state.vi.lines_per_field() {
            return Err(SaveStateError::component(
                "vi",
                format!(
                    "line {} outside a {}-line field",
                    state.vi.current() >> 1,
                    state.vi.lines_per_field()
                ),
            ));
        }
        if state.ai.depth() > 2 {
            return Err(SaveStateError::component(
                "ai",
                format!("{} buffers queued", state.ai.depth()),
            ));
        }

        scheduler.check_pending(N64Event::AiDma, state.ai.is_busy(), "ai")?;
        for (kind, engine) in [
            (N64Event::PiDma, &state.pi),
            (N64Event::SiDma, &state.si),
            (N64Event::SpDma, &state.sp),
        ] {
            scheduler.check_pending(kind, engine.is_busy(), "dma")?;
        }

        Ok(Self {
            scheduler,
            vi: state.vi.clone(),
            ai: state.ai.clone(),
            cp0: state.cp0.clone(),
            pi: state.pi.clone(),
            si: state.si.clone(),
            sp: state.sp.clone(),
            mi_intr,
            mi_mask,
        })
    }
}

impl Default for N64System {
    fn default() -> Self {
        Self::new()
    }
}

fn on_vi(n64: &mut N64System, elapsed: Cycles) {
    let (delay, raised) = n64.vi.on_event(elapsed);
    if raised {
        n64.mi_intr |= MiInterrupts::VI;
    }
    n64.scheduler.schedule(N64Event::Vi, delay);
}

fn on_ai_sample(n64: &mut N64System, elapsed: Cycles) {
    let delay = n64.ai.on_sample(elapsed);
    n64.scheduler.schedule(N64Event::AiSample, delay);
}

fn on_ai_dma(n64: &mut N64System, elapsed: Cycles) {
    n64.mi_intr |= MiInterrupts::AI;
    if let Some(duration) = n64.ai.on_buffer_done(elapsed) {
        n64.scheduler.schedule(N64Event::AiDma, duration);
    }
}

fn on_compare_timer(n64: &mut N64System, elapsed: Cycles) {
    let delay = n64.cp0.on_event(elapsed);
    n64.scheduler.schedule(N64Event::CompareTimer, delay);
}

fn on_pi_dma(n64: &mut N64System, _elapsed: Cycles) {
    n64.pi.finish();
    n64.mi_intr |= MiInterrupts::PI;
}

fn on_si_dma(n64: &mut N64System, _elapsed: Cycles) {
    n64.si.finish();
    n64.mi_intr |= MiInterrupts::SI;
}

fn on_sp_dma(n64: &mut N64System, _elapsed: Cycles) {
    n64.sp.finish();
}

impl EventDispatch for N64System {
    type Kind = N64Event;

    const HANDLERS: &'static [Handler<Self>] = &[
        on_vi,
        on_ai_sample,
        on_ai_dma,
        on_compare_timer,
        on_pi_dma,
        on_si_dma,
        on_sp_dma,
    ];

    const ALWAYS_PENDING: &'static [N64Event] =
        &[N64Event::Vi, N64Event::AiSample, N64Event::CompareTimer];

    fn scheduler(&self) -> &Scheduler<N64Event> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<N64Event> {
        &mut self.scheduler
    }

    /// One COUNT increment
    fn alignment(&self) -> Cycles {
        cp0::COUNT_DIVIDER
    }
}

/// Persisted form of an [`N64System`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct N64State {
    pub scheduler: SchedulerState,
    pub vi: VideoInterface,
    pub ai: AudioInterface,
    pub cp0: CompareTimer,
    pub pi: DmaEngine,
    pub si: DmaEngine,
    pub sp: DmaEngine,
    pub mi_intr: u32,
    pub mi_mask: u32,
}
