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

//! 8-bit handheld (Game Boy / Game Boy Color)
//!
//! The time base runs at 8.388608 MHz, twice the normal-speed CPU clock, so
//! both speed modes map onto whole ticks:
//!
//! ```text
//! Clock                  | Ticks per cycle
//! -----------------------|----------------
//! T-cycle, normal speed  | 2
//! T-cycle, double speed  | 1
//! LCD dot                | 2
//! PSG clock              | 2
//! ```
//!
//! The LCD and the APU keep their rate across a speed switch. The timer, the
//! serial port and OAM DMA are clocked by the CPU and are re-armed when the
//! speed changes (see [`GbSystem::set_double_speed`]).

pub mod dma;
pub mod event;
pub mod interrupt;
pub mod ppu;
pub mod timer;

#[cfg(test)]
mod tests;

pub use dma::OamDma;
pub use event::GbEvent;
pub use interrupt::Interrupts;
pub use ppu::{Mode, Ppu};
pub use timer::{Timer, TimerStep};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::error::SaveStateError;
use super::psg::{Psg, PsgChannel, SAMPLE_RATE};
use super::sio::{SerialPort, Transfer};
use super::timing::{Cycles, EventDispatch, Handler, Scheduler, SchedulerState, Timestamp};

/// Time base frequency in Hz
pub const CLOCK_HZ: u64 = 8_388_608;

/// Ticks per frame (154 lines of 456 dots)
pub const FRAME_TICKS: Cycles = ppu::LINE_DOTS * ppu::DOT_TICKS * ppu::TOTAL_LINES as Cycles;

/// Work RAM size (bank 0 and 1)
pub const WRAM_SIZE: usize = 0x2000;

/// Serial bit period in T-cycles with the normal clock (8192 Hz)
const SERIAL_BIT_CYCLES: Cycles = 512;

/// Serial bit period in T-cycles with the CGB fast clock
const SERIAL_FAST_BIT_CYCLES: Cycles = 16;

/// PSG clock in ticks
const PSG_UNIT: Cycles = 2;

/// Game Boy system timing model
///
/// Owns the scheduler and every timed peripheral. The processor is an
/// external collaborator: it calls [`EventDispatch::tick`] with the cycles
/// each instruction took and accesses peripherals through
/// [`GbSystem::read_io`] / [`GbSystem::write_io`].
///
/// # Example
///
/// ```
/// use retrocore::core::gb::{GbSystem, Interrupts};
///
/// let mut gb = GbSystem::new();
/// gb.write_io(0xFFFF, Interrupts::VBLANK.bits());
///
/// gb.run_frame();
/// assert_eq!(gb.frame_count(), 1);
/// assert!(gb.pending_interrupts().contains(Interrupts::VBLANK));
/// ```
#[derive(Debug, Clone)]
pub struct GbSystem {
    scheduler: Scheduler<GbEvent>,

    ppu: Ppu,
    apu: Psg,
    timer: Timer,
    serial: SerialPort,
    dma: OamDma,

    /// Serial data (SB)
    sb: u8,

    /// Serial control (SC)
    sc: u8,

    /// NR13/NR14, NR23/NR24, NR33/NR34 frequency values
    frequency: [u16; 3],

    /// NR52 bit 7
    apu_power: bool,

    wave_ram: [u8; 16],
    wram: Vec<u8>,
    oam: Vec<u8>,

    interrupt_flag: Interrupts,
    interrupt_enable: Interrupts,

    double_speed: bool,

    /// KEY1 bit 0: switch speed on the next STOP
    speed_armed: bool,

    /// Mixed output not yet drained by the frontend
    samples: Vec<i16>,
}

impl GbSystem {
    /// Create a system in its power-on state with the LCD and the mixer
    /// running
    pub fn new() -> Self {
        let mut gb = Self {
            scheduler: Scheduler::new(),
            ppu: Ppu::new(),
            apu: Psg::new(PSG_UNIT, CLOCK_HZ / u64::from(SAMPLE_RATE)),
            timer: Timer::new(2),
            serial: SerialPort::new(2),
            dma: OamDma::new(),
            sb: 0,
            sc: 0,
            frequency: [0; 3],
            apu_power: true,
            wave_ram: [0; 16],
            wram: vec![0; WRAM_SIZE],
            oam: vec![0; dma::OAM_SIZE],
            interrupt_flag: Interrupts::empty(),
            interrupt_enable: Interrupts::empty(),
            double_speed: false,
            speed_armed: false,
            samples: Vec::new(),
        };
        gb.arm_infrastructure();
        gb
    }

    /// Return to the power-on state
    pub fn reset(&mut self) {
        *self = Self::new();
        log::info!("GB: reset");
    }

    fn arm_infrastructure(&mut self) {
        self.scheduler.schedule(GbEvent::Ppu, self.ppu.next_delay());
        self.scheduler.schedule(GbEvent::ApuSample, self.apu.next_sample_delay());
    }

    /// Time base ticks per CPU T-cycle at the current speed
    #[inline]
    pub fn t_cycle_ticks(&self) -> Cycles {
        if self.double_speed {
            1
        } else {
            2
        }
    }

    #[inline]
    pub fn is_double_speed(&self) -> bool {
        self.double_speed
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
    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    #[inline]
    pub fn apu(&self) -> &Psg {
        &self.apu
    }

    #[inline]
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    #[inline]
    pub fn oam(&self) -> &[u8] {
        &self.oam
    }

    #[inline]
    pub fn wram_mut(&mut self) -> &mut [u8] {
        &mut self.wram
    }

    /// Take every mixed sample produced so far
    pub fn drain_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }

    /// Interrupts both requested and enabled
    #[inline]
    pub fn pending_interrupts(&self) -> Interrupts {
        self.interrupt_flag & self.interrupt_enable
    }

    /// Request an interrupt from outside the timed peripherals (joypad)
    pub fn request_interrupt(&mut self, irq: Interrupts) {
        self.interrupt_flag |= irq;
    }

    /// Clear IF bits once the CPU has serviced them
    pub fn acknowledge(&mut self, irq: Interrupts) {
        self.interrupt_flag.remove(irq);
    }

    /// Read an I/O register
    pub fn read_io(&self, address: u16) -> u8 {
        match address {
            0xFF01 => {
                if self.serial.is_active() {
                    self.serial.data() as u8
                } else {
                    self.sb
                }
            }
            0xFF02 => self.sc | 0x7C,
            0xFF04 => self.timer.div(),
            0xFF05 => self.timer.tima(self.scheduler.elapsed(GbEvent::Timer)),
            0xFF06 => self.timer.tma(),
            0xFF07 => self.timer.tac(),
            0xFF0F => self.interrupt_flag.bits() | 0xE0,
            0xFF26 => {
                let active = (0..4)
                    .filter(|&index| self.apu.channel(index).is_enabled())
                    .fold(0u8, |bits, index| bits | 1 << index);
                0x70 | u8::from(self.apu_power) << 7 | active
            }
            0xFF30..=0xFF3F => self.wave_ram[usize::from(address - 0xFF30)],
            0xFF41 => self.ppu.stat(),
            0xFF44 => self.ppu.ly(),
            0xFF45 => self.ppu.lyc(),
            0xFF46 => self.dma.source(),
            0xFF4D => u8::from(self.double_speed) << 7 | 0x7E | u8::from(self.speed_armed),
            0xFFFF => self.interrupt_enable.bits(),
            _ => 0xFF,
        }
    }

    /// Write an I/O register
    pub fn write_io(&mut self, address: u16, value: u8) {
        match address {
            0xFF01 => self.sb = value,
            0xFF02 => self.write_serial_control(value),
            0xFF04 => {
                self.remove_and_flush(GbEvent::Timer);
                self.timer.reset_div();
                self.arm_timer();
            }
            0xFF05 => {
                // A write inside the reload window cancels the reload.
                self.scheduler.remove_silent(GbEvent::TimerReload);
                self.remove_and_flush(GbEvent::Timer);
                self.timer.write_tima(value);
                self.arm_timer();
            }
            0xFF06 => self.timer.write_tma(value),
            0xFF07 => {
                self.remove_and_flush(GbEvent::Timer);
                self.timer.write_tac(value);
                self.arm_timer();
            }
            0xFF0F => self.interrupt_flag = Interrupts::from_bits_truncate(value),
            0xFF10..=0xFF26 => self.write_sound(address, value),
            0xFF30..=0xFF3F => {
                self.wave_ram[usize::from(address - 0xFF30)] = value;
                let wave = self.wave_ram;
                self.apu.channel_mut(2).load_wave(&wave);
            }
            0xFF41 => self.ppu.write_stat(value),
            0xFF45 => self.ppu.write_lyc(value),
            0xFF46 => self.start_oam_dma(value),
            0xFF4D => self.speed_armed = value & 0x01 != 0,
            0xFFFF => self.interrupt_enable = Interrupts::from_bits_truncate(value),
            _ => log::trace!("GB: ignored write {value:#04X} to {address:#06X}"),
        }
    }

    fn arm_timer(&mut self) {
        if self.timer.is_enabled() && !self.timer.is_reloading() {
            self.scheduler
                .schedule(GbEvent::Timer, self.timer.overflow_delay());
        }
    }

    fn write_serial_control(&mut self, value: u8) {
        self.sc = value & 0x83;

        if value & 0x80 == 0 {
            if self.serial.is_active() {
                self.serial.abort();
                self.scheduler.remove_silent(GbEvent::Serial);
            }
            return;
        }

        // External clock transfers wait for a link partner that never comes.
        if value & 0x01 == 0 {
            self.serial.abort();
            self.scheduler.remove_silent(GbEvent::Serial);
            return;
        }

        let bit_period = if value & 0x02 != 0 {
            SERIAL_FAST_BIT_CYCLES
        } else {
            SERIAL_BIT_CYCLES
        };
        self.serial.set_data(u32::from(self.sb));
        let delay = self.serial.start(8, bit_period);
        self.scheduler.schedule(GbEvent::Serial, delay);
    }

    fn start_oam_dma(&mut self, source: u8) {
        let base = usize::from(source) << 8;
        let block = (0..dma::OAM_SIZE)
            .map(|offset| match base + offset {
                address @ 0xC000..=0xFDFF => self.wram[(address - 0xC000) % WRAM_SIZE],
                _ => 0xFF,
            })
            .collect();

        let duration = self.dma.start(source, block, self.t_cycle_ticks());
        self.scheduler.schedule(GbEvent::OamDma, duration);
    }

    fn write_sound(&mut self, address: u16, value: u8) {
        if !self.apu_power && address != 0xFF26 {
            return;
        }

        match address {
            0xFF11 => self.apu.channel_mut(0).set_duty(value >> 6),
            0xFF16 => self.apu.channel_mut(1).set_duty(value >> 6),
            0xFF12 | 0xFF17 | 0xFF21 => {
                let index = match address {
                    0xFF12 => 0,
                    0xFF17 => 1,
                    _ => 3,
                };
                self.apu.channel_mut(index).set_volume(value >> 4);
                if value & 0xF8 == 0 {
                    self.silence_channel(index);
                }
            }
            0xFF1A => {
                if value & 0x80 == 0 {
                    self.silence_channel(2);
                }
            }
            0xFF1C => {
                let volume = match (value >> 5) & 0x03 {
                    0 => 0,
                    1 => 15,
                    2 => 7,
                    _ => 3,
                };
                self.apu.channel_mut(2).set_volume(volume);
            }
            0xFF13 | 0xFF18 | 0xFF1D => {
                let index = usize::from((address - 0xFF13) / 5);
                let frequency = (self.frequency[index] & 0x700) | u16::from(value);
                self.set_channel_frequency(index, frequency);
            }
            0xFF14 | 0xFF19 | 0xFF1E => {
                let index = usize::from((address - 0xFF14) / 5);
                let frequency = (self.frequency[index] & 0xFF) | u16::from(value & 0x07) << 8;
                self.set_channel_frequency(index, frequency);
                if value & 0x80 != 0 {
                    self.trigger_channel(index);
                }
            }
            0xFF22 => self.retune_channel(3, |channel| {
                channel.set_noise(value & 0x07, value >> 4, value & 0x08 != 0)
            }),
            0xFF23 => {
                if value & 0x80 != 0 {
                    self.trigger_channel(3);
                }
            }
            0xFF26 => {
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

    fn set_channel_frequency(&mut self, index: usize, frequency: u16) {
        self.frequency[index] = frequency;
        self.retune_channel(index, |channel| channel.set_frequency(frequency));
    }

    /// Apply a period change, ticking off the old period's progress first
    fn retune_channel(&mut self, index: usize, apply: impl FnOnce(&mut PsgChannel)) {
        let kind = GbEvent::apu_channel(index);
        let running = self.remove_and_flush(kind).is_some();

        let channel = self.apu.channel_mut(index);
        apply(channel);
        if running && channel.is_enabled() {
            self.scheduler.schedule(kind, channel.next_delay());
        }
    }

    fn trigger_channel(&mut self, index: usize) {
        let delay = self.apu.channel_mut(index).trigger();
        self.scheduler.schedule(GbEvent::apu_channel(index), delay);
    }

    fn silence_channel(&mut self, index: usize) {
        self.remove_and_flush(GbEvent::apu_channel(index));
        self.apu.channel_mut(index).disable();
    }

    /// Execute STOP: performs a pending speed switch
    ///
    /// Returns whether the speed changed.
    pub fn stop(&mut self) -> bool {
        if !self.speed_armed {
            return false;
        }
        self.speed_armed = false;
        self.set_double_speed(!self.double_speed);
        true
    }

    /// Switch between normal and double speed
    ///
    /// Periodic CPU-clocked events are flushed so the cycles accrued at the
    /// old rate are counted, then re-armed at the new rate. One-shot events
    /// keep their remaining CPU cycles, rescaled to the new tick length.
    pub fn set_double_speed(&mut self, enabled: bool) {
        if enabled == self.double_speed {
            return;
        }

        let old_unit = self.t_cycle_ticks();
        let now = self.scheduler.now();

        let mut rearm = Vec::with_capacity(GbEvent::CLOCK_RELATIVE.len());
        for &kind in GbEvent::CLOCK_RELATIVE {
            if kind.is_periodic() {
                if self.remove_and_flush(kind).is_some() {
                    rearm.push((kind, None));
                }
            } else if let Some(event) = self.scheduler.remove_silent(kind) {
                rearm.push((kind, Some(event.remaining_at(now))));
            }
        }

        self.double_speed = enabled;
        let unit = self.t_cycle_ticks();
        self.timer.set_unit(unit);
        self.serial.set_unit(unit);

        for (kind, remaining) in rearm {
            let delay = match remaining {
                Some(remaining) => (remaining * unit).div_ceil(old_unit).max(1),
                None => match kind {
                    GbEvent::Timer => self.timer.overflow_delay(),
                    _ => self.serial.next_delay(),
                },
            };
            self.scheduler.schedule(kind, delay);
        }

        log::debug!(
            "GB: switched to {} speed at {now}",
            if enabled { "double" } else { "normal" }
        );
    }

    /// Skip ahead event by event until an enabled interrupt is requested
    ///
    /// Used while the CPU is halted. Gives up after `limit` ticks so that a
    /// HALT with no possible wake-up source cannot spin forever. Returns the
    /// ticks skipped.
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

    /// Run until the LCD enters the next VBlank
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

    /// Snapshot for a save state
    pub fn to_state(&self) -> GbState {
        GbState {
            scheduler: self.scheduler.to_state(),
            ppu: self.ppu.clone(),
            apu: self.apu.clone(),
            timer: self.timer.clone(),
            serial: self.serial.clone(),
            dma: self.dma.clone(),
            sb: self.sb,
            sc: self.sc,
            frequency: self.frequency,
            apu_power: self.apu_power,
            wave_ram: self.wave_ram,
            wram: self.wram.clone(),
            oam: self.oam.clone(),
            interrupt_flag: self.interrupt_flag.bits(),
            interrupt_enable: self.interrupt_enable.bits(),
            double_speed: self.double_speed,
            speed_armed: self.speed_armed,
        }
    }

    /// Rebuild from a save state, rejecting inconsistent data
    pub fn from_state(state: &GbState) -> Result<Self, SaveStateError> {
        let scheduler = Scheduler::from_state(&state.scheduler)?;
        scheduler.require_pending(Self::ALWAYS_PENDING)?;

        if state.wram.len() != WRAM_SIZE {
            return Err(SaveStateError::component(
                "wram",
                format!("expected {WRAM_SIZE} bytes, got {}", state.wram.len()),
            ));
        }
        if state.oam.len() != dma::OAM_SIZE {
            return Err(SaveStateError::component(
                "oam",
                format!("expected {} bytes, got {}", dma::OAM_SIZE, state.oam.len()),
            ));
        }

        let interrupt_flag = Interrupts::from_bits(state.interrupt_flag)
            .ok_or_else(|| SaveStateError::component("interrupts", "invalid IF"))?;
        let interrupt_enable = Interrupts::from_bits_truncate(state.interrupt_enable);

        let timer_running = state.timer.is_enabled() && !state.timer.is_reloading();
        scheduler.check_pending(GbEvent::Timer, timer_running, "timer")?;
        scheduler.check_pending(GbEvent::TimerReload, state.timer.is_reloading(), "timer")?;
        scheduler.check_pending(GbEvent::Serial, state.serial.is_active(), "serial")?;
        scheduler.check_pending(GbEvent::OamDma, state.dma.is_active(), "oam dma")?;
        for index in 0..4 {
            scheduler.check_pending(
                GbEvent::apu_channel(index),
                state.apu.channel(index).is_enabled(),
                "apu",
            )?;
        }

        Ok(Self {
            scheduler,
            ppu: state.ppu.clone(),
            apu: state.apu.clone(),
            timer: state.timer.clone(),
            serial: state.serial.clone(),
            dma: state.dma.clone(),
            sb: state.sb,
            sc: state.sc,
            frequency: state.frequency,
            apu_power: state.apu_power,
            wave_ram: state.wave_ram,
            wram: state.wram.clone(),
            oam: state.oam.clone(),
            interrupt_flag,
            interrupt_enable,
            double_speed: state.double_speed,
            speed_armed: state.speed_armed,
            samples: Vec::new(),
        })
    }
}

impl Default for GbSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn on_ppu(gb: &mut GbSystem, elapsed: Cycles) {
    let (delay, raised) = gb.ppu.on_event(elapsed);
    gb.interrupt_flag |= raised;
    gb.scheduler.schedule(GbEvent::Ppu, delay);
}

fn on_apu_sample(gb: &mut GbSystem, elapsed: Cycles) {
    let delay = gb.apu.on_sample(elapsed, &mut gb.samples);
    gb.scheduler.schedule(GbEvent::ApuSample, delay);
}

fn on_apu_channel(gb: &mut GbSystem, index: usize, elapsed: Cycles) {
    if let Some(delay) = gb.apu.channel_mut(index).on_period(elapsed) {
        gb.scheduler.schedule(GbEvent::apu_channel(index), delay);
    }
}

fn on_apu_channel1(gb: &mut GbSystem, elapsed: Cycles) {
    on_apu_channel(gb, 0, elapsed);
}

fn on_apu_channel2(gb: &mut GbSystem, elapsed: Cycles) {
    on_apu_channel(gb, 1, elapsed);
}

fn on_apu_channel3(gb: &mut GbSystem, elapsed: Cycles) {
    on_apu_channel(gb, 2, elapsed);
}

fn on_apu_channel4(gb: &mut GbSystem, elapsed: Cycles) {
    on_apu_channel(gb, 3, elapsed);
}

fn apply_timer_step(gb: &mut GbSystem, step: TimerStep) {
    match step {
        TimerStep::Rearm(delay) => gb.scheduler.schedule(GbEvent::Timer, delay),
        TimerStep::Reload(delay) => gb.scheduler.schedule(GbEvent::TimerReload, delay),
        TimerStep::Reloaded(delay) => {
            gb.interrupt_flag |= Interrupts::TIMER;
            gb.scheduler.schedule(GbEvent::Timer, delay);
        }
    }
}

fn on_timer(gb: &mut GbSystem, elapsed: Cycles) {
    let step = gb.timer.on_overflow(elapsed);
    apply_timer_step(gb, step);
}

fn on_timer_reload(gb: &mut GbSystem, elapsed: Cycles) {
    gb.interrupt_flag |= Interrupts::TIMER;
    if let Some(step) = gb.timer.on_reload(elapsed) {
        apply_timer_step(gb, step);
    }
}

fn on_serial(gb: &mut GbSystem, elapsed: Cycles) {
    match gb.serial.on_bits(elapsed) {
        Transfer::Continue(delay) => gb.scheduler.schedule(GbEvent::Serial, delay),
        Transfer::Complete => {
            gb.sb = gb.serial.data() as u8;
            gb.sc &= 0x7F;
            gb.interrupt_flag |= Interrupts::SERIAL;
        }
    }
}

fn on_oam_dma(gb: &mut GbSystem, _elapsed: Cycles) {
    gb.dma.finish(&mut gb.oam);
}

impl EventDispatch for GbSystem {
    type Kind = GbEvent;

    const HANDLERS: &'static [Handler<Self>] = &[
        on_ppu,
        on_apu_sample,
        on_apu_channel1,
        on_apu_channel2,
        on_apu_channel3,
        on_apu_channel4,
        on_timer,
        on_timer_reload,
        on_serial,
        on_oam_dma,
    ];

    const ALWAYS_PENDING: &'static [GbEvent] = &[GbEvent::Ppu, GbEvent::ApuSample];

    fn scheduler(&self) -> &Scheduler<GbEvent> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<GbEvent> {
        &mut self.scheduler
    }

    /// One M-cycle
    fn alignment(&self) -> Cycles {
        4 * self.t_cycle_ticks()
    }

    fn tick(&mut self, cycles: Cycles) {
        self.timer.clock_div(cycles);
        self.scheduler.advance(cycles);
        self.run_due_events();
    }
}

/// Persisted form of a [`GbSystem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GbState {
    pub scheduler: SchedulerState,
    pub ppu: Ppu,
    pub apu: Psg,
    pub timer: Timer,
    pub serial: SerialPort,
    pub dma: OamDma,
    pub sb: u8,
    pub sc: u8,
    pub frequency: [u16; 3],
    pub apu_power: bool,
    pub wave_ram: [u8; 16],
    pub wram: Vec<u8>,
    pub oam: Vec<u8>,
    pub interrupt_flag: u8,
    pub interrupt_enable: u8,
    pub double_speed: bool,
    pub speed_armed: bool,
}
