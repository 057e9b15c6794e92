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

//! Machine selection and a uniform driver over the three systems

use std::fmt;
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::config::Config;
use super::error::{EmulatorError, SaveStateError};
use super::gb::GbSystem;
use super::gba::GbaSystem;
use super::n64::{self, N64System};
use super::save_state::{MachineState, SaveState, SAVE_STATE_VERSION};
use super::timing::{Cycles, EventDispatch, EventKind, Timestamp};

/// Supported machines
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    #[default]
    Gb,
    Gba,
    N64,
}

impl MachineKind {
    pub const ALL: [MachineKind; 3] = [MachineKind::Gb, MachineKind::Gba, MachineKind::N64];

    pub fn name(self) -> &'static str {
        match self {
            MachineKind::Gb => "gb",
            MachineKind::Gba => "gba",
            MachineKind::N64 => "n64",
        }
    }

    /// Time base frequency in Hz
    pub fn clock_hz(self) -> u64 {
        match self {
            MachineKind::Gb => super::gb::CLOCK_HZ,
            MachineKind::Gba => super::gba::CLOCK_HZ,
            MachineKind::N64 => n64::CLOCK_HZ,
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MachineKind {
    type Err = EmulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EmulatorError::UnknownMachine(s.to_string()))
    }
}

/// One pending event, for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEvent {
    pub kind: &'static str,
    pub due: Timestamp,
    pub due_in: Cycles,
}

fn pending_of<M: EventDispatch>(machine: &M) -> Vec<PendingEvent> {
    let scheduler = machine.scheduler();
    let now = scheduler.now();

    let mut events: Vec<_> = scheduler
        .pending()
        .map(|event| PendingEvent {
            kind: event.kind.name(),
            due: event.due,
            due_in: event.remaining_at(now),
        })
        .collect();
    events.sort_by_key(|event| event.due);
    events
}

/// One emulated machine
#[derive(Debug, Clone)]
pub enum Machine {
    Gb(GbSystem),
    Gba(GbaSystem),
    N64(N64System),
}

impl Machine {
    pub fn new(kind: MachineKind) -> Self {
        log::info!("Creating {kind} machine");
        match kind {
            MachineKind::Gb => Machine::Gb(GbSystem::new()),
            MachineKind::Gba => Machine::Gba(GbaSystem::new()),
            MachineKind::N64 => Machine::N64(N64System::new()),
        }
    }

    /// Create the machine named in `config` with its start-up options applied
    pub fn from_config(config: &Config) -> Self {
        let mut machine = Self::new(config.machine);
        match &mut machine {
            Machine::Gb(gb) => {
                if config.gb.double_speed {
                    gb.set_double_speed(true);
                }
            }
            Machine::Gba(_) => {}
            Machine::N64(n64) => n64.write_register(n64::AI_DACRATE, config.n64.dac_rate),
        }
        machine
    }

    pub fn kind(&self) -> MachineKind {
        match self {
            Machine::Gb(_) => MachineKind::Gb,
            Machine::Gba(_) => MachineKind::Gba,
            Machine::N64(_) => MachineKind::N64,
        }
    }

    /// Advance by `cycles` time base cycles, dispatching every due event
    pub fn step(&mut self, cycles: Cycles) {
        match self {
            Machine::Gb(gb) => gb.tick(cycles),
            Machine::Gba(gba) => gba.tick(cycles),
            Machine::N64(n64) => n64.tick(cycles),
        }
    }

    /// Jump to the next pending event and dispatch it
    pub fn skip_to_event(&mut self) -> Option<Cycles> {
        match self {
            Machine::Gb(gb) => gb.skip_to_event(),
            Machine::Gba(gba) => gba.skip_to_event(),
            Machine::N64(n64) => n64.skip_to_event(),
        }
    }

    /// Skip to the next event (as a halted CPU would) until an interrupt is
    /// raised or `limit` cycles pass; returns the cycles skipped
    pub fn halt_until_event(&mut self, limit: Cycles) -> Cycles {
        match self {
            Machine::Gb(gb) => gb.halt_until_interrupt(limit),
            Machine::Gba(gba) => gba.halt_until_interrupt(limit),
            Machine::N64(n64) => n64.halt_until_interrupt(limit),
        }
    }

    pub fn run_frame(&mut self) -> Cycles {
        match self {
            Machine::Gb(gb) => gb.run_frame(),
            Machine::Gba(gba) => gba.run_frame(),
            Machine::N64(n64) => n64.run_frame(),
        }
    }

    pub fn now(&self) -> Timestamp {
        match self {
            Machine::Gb(gb) => gb.now(),
            Machine::Gba(gba) => gba.now(),
            Machine::N64(n64) => n64.now(),
        }
    }

    pub fn frame_count(&self) -> u64 {
        match self {
            Machine::Gb(gb) => gb.frame_count(),
            Machine::Gba(gba) => gba.frame_count(),
            Machine::N64(n64) => n64.frame_count(),
        }
    }

    /// Pending events, earliest first
    pub fn pending_events(&self) -> Vec<PendingEvent> {
        match self {
            Machine::Gb(gb) => pending_of(gb),
            Machine::Gba(gba) => pending_of(gba),
            Machine::N64(n64) => pending_of(n64),
        }
    }

    /// Capture the full timing state
    pub fn save_state(&self) -> SaveState {
        let state = match self {
            Machine::Gb(gb) => MachineState::Gb(gb.to_state()),
            Machine::Gba(gba) => MachineState::Gba(gba.to_state()),
            Machine::N64(n64) => MachineState::N64(n64.to_state()),
        };
        SaveState::new(state, self.now(), self.frame_count())
    }

    /// Replace this machine with the one captured in `state`
    ///
    /// Leaves the machine untouched on error.
    pub fn load_state(&mut self, state: &SaveState) -> Result<(), SaveStateError> {
        if state.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                got: state.version,
            });
        }

        let restored = match (self.kind(), &state.machine) {
            (MachineKind::Gb, MachineState::Gb(gb)) => Machine::Gb(GbSystem::from_state(gb)?),
            (MachineKind::Gba, MachineState::Gba(gba)) => {
                Machine::Gba(GbaSystem::from_state(gba)?)
            }
            (MachineKind::N64, MachineState::N64(n64)) => {
                Machine::N64(N64System::from_state(n64)?)
            }
            (expected, got) => {
                return Err(SaveStateError::MachineMismatch {
                    expected: expected.name(),
                    got: got.kind().name(),
                })
            }
        };

        *self = restored;
        log::info!("Loaded {} save state at cycle {}", self.kind(), self.now());
        Ok(())
    }

    /// Load `state`, falling back to a clean reset when it is rejected
    ///
    /// Returns whether the state was applied.
    pub fn restore_or_reset(&mut self, state: &SaveState) -> bool {
        match self.load_state(state) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Discarding save state ({e}); resetting {}", self.kind());
                self.reset();
                false
            }
        }
    }

    pub fn reset(&mut self) {
        match self {
            Machine::Gb(gb) => gb.reset(),
            Machine::Gba(gba) => gba.reset(),
            Machine::N64(n64) => n64.reset(),
        }
    }
}
