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

//! Save states
//!
//! A save state captures one machine's scheduler together with every timed
//! component, so that a restored machine dispatches exactly the same events
//! at exactly the same cycles as the original would have.
//!
//! # Save State Format
//!
//! bincode with the standard configuration:
//!
//! - Version number
//! - Metadata (timestamp, machine, cycle and frame counts)
//! - Machine state: scheduler fragment plus component states
//!
//! Loading a state with a different version fails with
//! [`SaveStateError::VersionMismatch`].
//!
//! # Example
//!
//! ```no_run
//! use retrocore::core::machine::{Machine, MachineKind};
//! use retrocore::core::save_state::SaveState;
//!
//! let mut machine = Machine::new(MachineKind::Gb);
//! machine.run_frame();
//!
//! machine.save_state().save_to_file("gb.state").unwrap();
//!
//! let state = SaveState::load_from_file("gb.state").unwrap();
//! machine.restore_or_reset(&state);
//! ```

use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::error::{Result, SaveStateError};
use super::gb::GbState;
use super::gba::GbaState;
use super::machine::MachineKind;
use super::n64::N64State;
use super::timing::Timestamp;

/// Save state version for compatibility checking
///
/// Incremented whenever the encoded layout changes.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Complete save state
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct SaveState {
    pub version: u32,
    pub metadata: SaveStateMetadata,
    pub machine: MachineState,
}

/// Save state metadata
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct SaveStateMetadata {
    /// When the state was captured
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    pub machine: MachineKind,

    /// Time base value at capture
    pub cycles: Timestamp,

    pub frame_count: u64,
}

/// Per-machine payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum MachineState {
    Gb(GbState),
    Gba(GbaState),
    N64(N64State),
}

impl MachineState {
    pub fn kind(&self) -> MachineKind {
        match self {
            MachineState::Gb(_) => MachineKind::Gb,
            MachineState::Gba(_) => MachineKind::Gba,
            MachineState::N64(_) => MachineKind::N64,
        }
    }
}

impl SaveState {
    /// Wrap a machine payload with fresh metadata
    pub fn new(machine: MachineState, cycles: Timestamp, frame_count: u64) -> Self {
        Self {
            version: SAVE_STATE_VERSION,
            metadata: SaveStateMetadata {
                timestamp: Utc::now(),
                machine: machine.kind(),
                cycles,
                frame_count,
            },
            machine,
        }
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, SaveStateError> {
        Ok(bincode::encode_to_vec(self, config::standard())?)
    }

    /// Decode and check the version
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, SaveStateError> {
        let (state, _): (SaveState, usize) =
            bincode::decode_from_slice(bytes, config::standard())?;

        if state.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                got: state.version,
            });
        }
        if state.metadata.machine != state.machine.kind() {
            return Err(SaveStateError::MachineMismatch {
                expected: state.metadata.machine.name(),
                got: state.machine.kind().name(),
            });
        }

        Ok(state)
    }

    /// Save state to file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Serialization fails
    /// - File cannot be created or written
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = self.to_bytes()?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(&encoded)?;
        log::debug!(
            "Wrote {} byte save state to {}",
            encoded.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Load state from file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be opened or read
    /// - Deserialization fails
    /// - Version is incompatible
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Self::from_bytes(&buffer)?)
    }
}
