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

//! 32-bit handheld (Game Boy Advance)
//!
//! The time base is the 16.78 MHz CPU clock. Every peripheral here runs off
//! that one clock, so no event needs rescaling at run time.
//!
//! ```text
//! Clock          | Cycles per tick
//! ---------------|----------------
//! CPU            | 1
//! PSG            | 4
//! Scan line      | 1232
//! SIO bit, 2 MHz | 8
//! SIO bit, 256 K | 64
//! ```

pub mod dma;
pub mod event;
pub mod interrupt;
pub mod ppu;
pub mod timer;

#[cfg(test)]
mod tests;

pub use dma::{DmaChannel, StartTiming};
pub use event::GbaEvent;
pub use interrupt::Interrupts;
pub use ppu::{GbaPpu, PpuSignals};
pub use timer::GbaTimer;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::error::SaveStateError;
use super::psg::{Psg, PsgChannel, SAMPLE_RATE};
use super::sio::{SerialPort, Transfer};
use super::timing::{Cycles, EventDispatch, Handler, Scheduler, SchedulerState, Timestamp};

/// CPU clock in Hz
pub const CLOCK_HZ: u64 = 16_777_216;

/// Cycles per frame (228 lines of 1232 cycles)
pub const FRAME_CYCLES: Cycles = ppu::LINE_CYCLES * ppu::TOTAL_LINES as Cycles;

/// Base address of the I/O register block
pub const IO_BASE: u32 = 0x0400_0000;

const PSG_UNIT: Cycles = 4;

const SIO_BIT_CYCLES: Cycles = 64;
const SIO_FAST_BIT_CYCLES: Cycles = 8;

const SIOCNT_INTERNAL_CLOCK: u16 = 1 << 0;
const SIOCNT_FAST: u16 = 1 << 1;
const SIOCNT_START: u16 = 1 << 7;
const SIOCNT_WIDE: u16 = 1 << 12;
const SIOCNT_IRQ: u16 = 1 << 14;

/// Game Boy Advance system timing model
///
/// Same division of labour as the 8-bit handheld: the CPU core calls
/// [`EventDispatch::tick`] and goes through [`GbaSystem::read_io`] and
/// [`GbaSystem::write_io`] for 16-bit I/O accesses.
#[derive(Debug, Clone)]
pub struct GbaSystem {
    scheduler: Scheduler<GbaEvent>,

    ppu: GbaPpu,
    apu: Psg,
    timers: [GbaTimer; 4],
    dma: [DmaChannel; 4],
    serial: SerialPort,

    /// SIOCNT
    siocnt: u16,

    /// SIODATA32 (SIODATA8 is the low byte)
    siodata: u32,

    /// Frequency field of the three tone channels
    frequency: [u16; 3],

    /// SOUNDCNT_X bit 7
    apu_power: bool,

    wave_ram: [u8; 16],

    interrupt_flag: Interrupts,
    interrupt_enable: Interrupts,
    master_enable: bool,

    samples: Vec<i16>,
}

impl GbaSystem {
    pub fn new() -> Self {
        let mut gba = Self {
            scheduler: Scheduler::new(),
            ppu: GbaPpu::new(),
            apu: Psg::new(PSG_UNIT, CLOCK_HZ / u64::from(SAMPLE_RATE)),
            timers: std::array::from_fn(|index| GbaTimer::new(index as u8)),
            dma: std::array::from_fn(|index| DmaChannel::new(index as u8)),
            serial: SerialPort::new(1),
            siocnt: 0,
            siodata: 0,
            frequency: [0; 3],
            apu_power: true,
            wave_ram: [0; 16],
            interrupt_flag: Interrupts::empty(),
            interrupt_enable: Interrupts::empty(),
            master_enable: false,
            samples: Vec::new(),
        };
        gba.scheduler.schedule(GbaEvent::Ppu, gba.ppu.next_delay());
        gba.scheduler
            .schedule(GbaEvent::ApuSample, gba.apu.next_sample_delay());
        gba
    }

    pub fn reset(&mut self) {
        *self = Self::new();
        log::info!("GBA: reset");
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.ppu.frame_count()
    }

    #[inline]
    pub fn ppu(&self) -> &GbaPpu {
        &self.ppu
    }

    #[inline]
    pub fn apu(&self) -> &Psg {
        &self.apu
    }

    #[inline]
    pub fn timer(&self, index: usize) -> &GbaTimer {
        &self.timers[index]
    }

    #[inline]
    pub fn dma_channel(&self, index: usize) -> &DmaChannel {
        &self.dma[index]
    }

    pub fn drain_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }

    /// Interrupts both requested and enabled
    ///
    /// HALT wakes on these regardless of IME.
    #[inline]
    pub fn pending_interrupts(&self) -> Interrupts {
        self.interrupt_flag & self.interrupt_enable
    }

    /// IME
    #[inline]
    pub fn master_enable(&self) -> bool {
        self.master_enable
    }

    /// Request an interrupt from outside the timed peripherals (keypad, cartridge)
    pub fn request_interrupt(&mut self, irq: Interrupts) {
        self.interrupt_flag |= irq;
    }

    /// Read a 16-bit I/O register
    pub fn read_io(&self, address: u32) -> u16 {
        match address.wrapping_sub(IO_BASE) {
            0x004 => self.ppu.dispstat(),
            0x006 => self.ppu.vcount(),
            0x084 => {
                let active = (0..4)
                    .filter(|&index| self.apu.channel(index).is_enabled())
                    .fold(0u16, |bits, index| bits | 1 << index);
                u16::from(self.apu_power) << 7 | active
            }
            offset @ 0x090..=0x09F => {
                let index = (offset - 0x090) as usize & !1;
                u16::from_le_bytes([self.wave_ram[index], self.wave_ram[index + 1]])
            }
            offset @ (0x0BA | 0x0C6 | 0x0D2 | 0x0DE) => {
                self.dma[((offset - 0x0BA) / 12) as usize].control()
            }
            offset @ (0x100 | 0x104 | 0x108 | 0x10C) => {
                let index = ((offset - 0x100) / 4) as usize;
                self.timers[index].counter(self.scheduler.elapsed(GbaEvent::timer(index)))
            }
            offset @ (0x102 | 0x106 | 0x10A | 0x10E) => {
                self.timers[((offset - 0x102) / 4) as usize].control()
            }
            0x120 => self.sio_data() as u16,
            0x122 => (self.sio_data() >> 16) as u16,
            0x128 => self.siocnt,
            0x12A => self.sio_data() as u16 & 0xFF,
            0x200 => self.interrupt_enable.bits(),
            0x202 => self.interrupt_flag.bits(),
            0x208 => u16::from(self.master_enable),
            _ => 0,
        }
    }

    /// Write a 16-bit I/O register
    pub fn write_io(&mut self, address: u32, value: u16) {
        match address.wrapping_sub(IO_BASE) {
            0x004 => self.ppu.write_dispstat(value),
            offset @ 0x060..=0x084 => self.write_sound(offset, value),
            offset @ 0x090..=0x09F => {
                let index = (offset - 0x090) as usize & !1;
                self.wave_ram[index..index + 2].copy_from_slice(&value.to_le_bytes());
                let wave = self.wave_ram;
                self.apu.channel_mut(2).load_wave(&wave);
            }
            offset @ (0x0B8 | 0x0C4 | 0x0D0 | 0x0DC) => {
                self.dma[((offset - 0x0B8) / 12) as usize].write_count(value)
            }
            offset @ (0x0BA | 0x0C6 | 0x0D2 | 0x0DE) => {
                self.write_dma_control(((offset - 0x0BA) / 12) as usize, value)
            }
            offset @ (0x100 | 0x104 | 0x108 | 0x10C) => {
                self.timers[((offset - 0x100) / 4) as usize].write_reload(value)
            }
            offset @ (0x102 | 0x106 | 0x10A | 0x10E) => {
                self.write_timer_control(((offset - 0x102) / 4) as usize, value)
            }
            0x120 => self.siodata = (self.siodata & 0xFFFF_0000) | u32::from(value),
            0x122 => self.siodata = (self.siodata & 0x0000_FFFF) | u32::from(value) << 16,
            0x128 => self.write_sio_control(value),
            0x12A => self.siodata = (self.siodata & !0xFF) | u32::from(value & 0xFF),
            0x200 => self.interrupt_enable = Interrupts::from_bits_truncate(value),
            // Writing 1 acknowledges
            0x202 => self.interrupt_flag.remove(Interrupts::from_bits_truncate(value)),
            0x208 => self.master_enable = value & 1 != 0,
            _ => log::trace!("GBA: ignored write {value:#06X} to {address:#010X}"),
        }
    }

    fn sio_data(&self) -> u32 {
        if self.serial.is_active() {
            self.serial.data()
        } else {
            self.siodata
        }
    }

    fn write_timer_control(&mut self, index: usize, value: u16) {
        let kind = GbaEvent::timer(index);
        self.remove_and_flush(kind);
        self.timers[index].write_control(value);

        if self.timers[index].is_free_running() {
            self.scheduler
                .schedule(kind, self.timers[index].overflow_delay());
        }
    }

    fn write_dma_control(&mut self, index: usize, value: u16) {
        let kind = GbaEvent::dma(index);
        let starting = self.dma[index].write_control(value);

        if !self.dma[index].is_enabled() {
            if self.scheduler.remove_silent(kind).is_some() {
                log::debug!("GBA: DMA{index} cancelled");
            }
        } else if starting && self.dma[index].start_timing() == StartTiming::Immediate {
            self.scheduler.schedule(kind, self.dma[index].duration());
        }
    }

    /// Start every idle channel waiting on `timing`
    ///
    /// `starts` holds how long ago each trigger passed, oldest first. A
    /// channel still busy at a trigger skips it. Transfers that would already
    /// have ended complete here, so the outcome does not depend on how late
    /// the display event was dispatched.
    fn trigger_dma(&mut self, timing: StartTiming, starts: &[Cycles]) {
        let now = self.scheduler.now();

        for index in 0..4 {
            if self.dma[index].start_timing() != timing {
                continue;
            }

            let kind = GbaEvent::dma(index);
            let pending = self.scheduler.remove_silent(kind);
            let mut busy_until = pending.map(|event| event.due);

            for &ago in starts {
                let start = now - ago;
                // A transfer ending on the trigger cycle frees the channel for it
                if busy_until.is_some_and(|due| due <= start) {
                    self.finish_dma(index);
                    busy_until = None;
                }
                if busy_until.is_none() && self.dma[index].is_enabled() {
                    busy_until = Some(start + self.dma[index].duration());
                }
            }

            match (busy_until, pending) {
                (Some(due), _) if due <= now => self.finish_dma(index),
                (Some(due), Some(event)) if event.due == due => self.scheduler.push(event),
                (Some(due), _) => self.scheduler.schedule(kind, due - now),
                (None, _) => {}
            }
        }
    }

    fn finish_dma(&mut self, index: usize) {
        if self.dma[index].finish() {
            self.interrupt_flag |= Interrupts::dma(index);
        }
    }

    fn write_sio_control(&mut self, value: u16) {
        let starting = self.siocnt & SIOCNT_START == 0 && value & SIOCNT_START != 0;
        self.siocnt = value;

        if value & SIOCNT_START == 0 {
            if self.serial.is_active() {
                self.serial.abort();
                self.scheduler.remove_silent(GbaEvent::Serial);
            }
            return;
        }

        if !starting || value & SIOCNT_INTERNAL_CLOCK == 0 {
            return;
        }

        let (width, data) = if value & SIOCNT_WIDE != 0 {
            (32, self.siodata)
        } else {
            (8, self.siodata & 0xFF)
        };
        let bit_period = if value & SIOCNT_FAST != 0 {
            SIO_FAST_BIT_CYCLES
        } else {
            SIO_BIT_CYCLES
        };

        self.serial.set_data(data);
        let delay = self.serial.start(width, bit_period);
        self.scheduler.schedule(GbaEvent::Serial, delay);
    }

    fn write_sound(&mut self, offset: u32, value: u16) {
        if !self.apu_power && offset != 0x084 {
            return;
        }

        match offset {
            0x062 | 0x068 => {
                let index = usize::from(offset == 0x068);
                self.apu.channel_mut(index).set_duty((value >> 6) as u8 & 0x03);
                self.set_channel_volume(index, (value >> 12) as u8);
            }
            0x064 | 0x06C | 0x074 => {
                let index = match offset {
                    0x064 => 0,
                    0x06C => 1,
                    _ => 2,
                };
                self.frequency[index] = value & 0x07FF;
                let frequency = self.frequency[index];
                self.retune_channel(index, |channel| channel.set_frequency(frequency));
                if value & 0x8000 != 0 {
                    self.trigger_channel(index);
                }
            }
            0x070 => {
                if value & 0x80 == 0 {
                    self.silence_channel(2);
                }
            }
            0x072 => {
                let volume = match (value >> 13) & 0x03 {
                    0 => 0,
                    1 => 15,
                    2 => 7,
                    _ => 3,
                };
                self.apu.channel_mut(2).set_volume(volume);
            }
            0x078 => self.set_channel_volume(3, (value >> 12) as u8),
            0x07C => {
                let divisor = (value & 0x07) as u8;
                let shift = ((value >> 4) & 0x0F) as u8;
                let narrow = value & 0x08 != 0;
                self.retune_channel(3, |channel| channel.set_noise(divisor, shift, narrow));
                if value & 0x8000 != 0 {
                    self.trigger_channel(3);
                }
            }
            0x084 => {
                let power = value & 0x80 != 0;
                if !power {
                    for index in 0..4 {
                        self.silence_channel(index);
                    }
                }
                self.apu_power = power;
            }
            _ => {}
        }
    }

    fn set_channel_volume(&mut self, index: usize, volume: u8) {
        self.apu.channel_mut(index).set_volume(volume);
        if volume == 0 {
            self.silence_channel(index);
        }
    }

    fn retune_channel(&mut self, index: usize, apply: impl FnOnce(&mut PsgChannel)) {
        let kind = GbaEvent::apu_channel(index);
        let running = self.remove_and_flush(kind).is_some();

        let channel = self.apu.channel_mut(index);
        apply(channel);
        if running && channel.is_enabled() {
            self.scheduler.schedule(kind, channel.next_delay());
        }
    }

    fn trigger_channel(&mut self, index: usize) {
        let delay = self.apu.channel_mut(index).trigger();
        self.scheduler.schedule(GbaEvent::apu_channel(index), delay);
    }

    fn silence_channel(&mut self, index: usize) {
        self.remove_and_flush(GbaEvent::apu_channel(index));
        self.apu.channel_mut(index).disable();
    }

    /// Skip ahead event by event until an enabled interrupt is requested,
    /// giving up after `limit` cycles
    pub fn halt_until_interrupt(&mut self, limit: Cycles) -> Cycles {
        let mut skipped = 0;
        while self.pending_interrupts().is_empty() && skipped < limit {
            match self.skip_to_event() {
                Some(cycles) => skipped += cycles,
                None => break,
            }
        }
        skipped
    }

    /// Run until the next VBlank starts
    pub fn run_frame(&mut self) -> Cycles {
        let target = self.ppu.frame_count() + 1;
        let mut elapsed = 0;
        while self.ppu.frame_count() < target {
            match self.skip_to_event() {
                Some(cycles) => elapsed += cycles,
                None => break,
            }
        }
        elapsed
    }

    pub fn to_state(&self) -> GbaState {
        GbaState {
            scheduler: self.scheduler.to_state(),
            ppu: self.ppu.clone(),
            apu: self.apu.clone(),
            timers: self.timers.clone(),
            dma: self.dma.clone(),
            serial: self.serial.clone(),
            siocnt: self.siocnt,
            siodata: self.siodata,
            frequency: self.frequency,
            apu_power: self.apu_power,
            wave_ram: self.wave_ram,
            interrupt_flag: self.interrupt_flag.bits(),
            interrupt_enable: self.interrupt_enable.bits(),
            master_enable: self.master_enable,
        }
    }

    /// Rebuild from a save state, rejecting inconsistent data
    pub fn from_state(state: &GbaState) -> Result<Self, SaveStateError> {
        let scheduler = Scheduler::from_state(&state.scheduler)?;
        scheduler.require_pending(Self::ALWAYS_PENDING)?;

        let interrupt_flag = Interrupts::from_bits(state.interrupt_flag)
            .ok_or_else(|| SaveStateError::component("interrupts", "invalid IF"))?;
        let interrupt_enable = Interrupts::from_bits_truncate(state.interrupt_enable);

        for (index, timer) in state.timers.iter().enumerate() {
            scheduler.check_pending(GbaEvent::timer(index), timer.is_free_running(), "timer")?;
        }

        for (index, channel) in state.dma.iter().enumerate() {
            let kind = GbaEvent::dma(index);
            if channel.start_timing() == StartTiming::Immediate {
                scheduler.check_pending(kind, channel.is_enabled(), "dma")?;
            } else if scheduler.is_active(kind) && !channel.is_enabled() {
                return Err(SaveStateError::component(
                    "dma",
                    format!("{kind:?} is pending for a disabled channel"),
                ));
            }
        }

        scheduler.check_pending(GbaEvent::Serial, state.serial.is_active(), "serial")?;
        for index in 0..4 {
            scheduler.check_pending(
                GbaEvent::apu_channel(index),
                state.apu.channel(index).is_enabled(),
                "apu",
            )?;
        }

        Ok(Self {
            scheduler,
            ppu: state.ppu.clone(),
            apu: state.apu.clone(),
            timers: state.timers.clone(),
            dma: state.dma.clone(),
            serial: state.serial.clone(),
            siocnt: state.siocnt,
            siodata: state.siodata,
            frequency: state.frequency,
            apu_power: state.apu_power,
            wave_ram: state.wave_ram,
            interrupt_flag,
            interrupt_enable,
            master_enable: state.master_enable,
            samples: Vec::new(),
        })
    }
}

impl Default for GbaSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn on_ppu(gba: &mut GbaSystem, elapsed: Cycles) {
    let (delay, signals) = gba.ppu.on_event(elapsed);
    gba.interrupt_flag |= signals.irq;
    gba.scheduler.schedule(GbaEvent::Ppu, delay);

    if let Some(since) = signals.vblank {
        gba.trigger_dma(StartTiming::VBlank, &[since]);
    }
    if !signals.hblank.is_empty() {
        gba.trigger_dma(StartTiming::HBlank, &signals.hblank);
    }
}

fn on_apu_sample(gba: &mut GbaSystem, elapsed: Cycles) {
    let delay = gba.apu.on_sample(elapsed, &mut gba.samples);
    gba.scheduler.schedule(GbaEvent::ApuSample, delay);
}

fn on_apu_channel(gba: &mut GbaSystem, index: usize, elapsed: Cycles) {
    if let Some(delay) = gba.apu.channel_mut(index).on_period(elapsed) {
        gba.scheduler.schedule(GbaEvent::apu_channel(index), delay);
    }
}

fn on_apu_channel1(gba: &mut GbaSystem, elapsed: Cycles) {
    on_apu_channel(gba, 0, elapsed);
}

fn on_apu_channel2(gba: &mut GbaSystem, elapsed: Cycles) {
    on_apu_channel(gba, 1, elapsed);
}

fn on_apu_channel3(gba: &mut GbaSystem, elapsed: Cycles) {
    on_apu_channel(gba, 2, elapsed);
}

fn on_apu_channel4(gba: &mut GbaSystem, elapsed: Cycles) {
    on_apu_channel(gba, 3, elapsed);
}

/// Overflow of a free-running timer, carried up the count-up chain
fn on_timer(gba: &mut GbaSystem, index: usize, elapsed: Cycles) {
    let mut wraps = gba.timers[index].on_overflow(elapsed);
    gba.scheduler
        .schedule(GbaEvent::timer(index), gba.timers[index].overflow_delay());

    let mut current = index;
    while wraps > 0 {
        if gba.timers[current].irq_enabled() {
            gba.interrupt_flag |= Interrupts::timer(current);
        }

        current += 1;
        match gba.timers.get_mut(current) {
            Some(next) if next.is_enabled() && next.is_count_up() => wraps = next.count(wraps),
            _ => break,
        }
    }
}

fn on_timer0(gba: &mut GbaSystem, elapsed: Cycles) {
    on_timer(gba, 0, elapsed);
}

fn on_timer1(gba: &mut GbaSystem, elapsed: Cycles) {
    on_timer(gba, 1, elapsed);
}

fn on_timer2(gba: &mut GbaSystem, elapsed: Cycles) {
    on_timer(gba, 2, elapsed);
}

fn on_timer3(gba: &mut GbaSystem, elapsed: Cycles) {
    on_timer(gba, 3, elapsed);
}

fn on_dma(gba: &mut GbaSystem, index: usize) {
    gba.finish_dma(index);
}

fn on_dma0(gba: &mut GbaSystem, _elapsed: Cycles) {
    on_dma(gba, 0);
}

fn on_dma1(gba: &mut GbaSystem, _elapsed: Cycles) {
    on_dma(gba, 1);
}

fn on_dma2(gba: &mut GbaSystem, _elapsed: Cycles) {
    on_dma(gba, 2);
}

fn on_dma3(gba: &mut GbaSystem, _elapsed: Cycles) {
    on_dma(gba, 3);
}

fn on_serial(gba: &mut GbaSystem, elapsed: Cycles) {
    match gba.serial.on_bits(elapsed) {
        Transfer::Continue(delay) => gba.scheduler.schedule(GbaEvent::Serial, delay),
        Transfer::Complete => {
            gba.siodata = gba.serial.data();
            gba.siocnt &= !SIOCNT_START;
            if gba.siocnt & SIOCNT_IRQ != 0 {
                gba.interrupt_flag |= Interrupts::SERIAL;
            }
        }
    }
}

impl EventDispatch for GbaSystem {
    type Kind = GbaEvent;

    const HANDLERS: &'static [Handler<Self>] = &[
        on_ppu,
        on_apu_sample,
        on_apu_channel1,
        on_apu_channel2,
        on_apu_channel3,
        on_apu_channel4,
        on_timer0,
        on_timer1,
        on_timer2,
        on_timer3,
        on_dma0,
        on_dma1,
        on_dma2,
        on_dma3,
        on_serial,
    ];

    const ALWAYS_PENDING: &'static [GbaEvent] = &[GbaEvent::Ppu, GbaEvent::ApuSample];

    fn scheduler(&self) -> &Scheduler<GbaEvent> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<GbaEvent> {
        &mut self.scheduler
    }
}

/// Persisted form of a [`GbaSystem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GbaState {
    pub scheduler: SchedulerState,
    pub ppu: GbaPpu,
    pub apu: Psg,
    pub timers: [GbaTimer; 4],
    pub dma: [DmaChannel; 4],
    pub serial: SerialPort,
    pub siocnt: u16,
    pub siodata: u32,
    pub frequency: [u16; 3],
    pub apu_power: bool,
    pub wave_ram: [u8; 16],
    pub interrupt_flag: u16,
    pub interrupt_enable: u16,
    pub master_enable: bool,
}
