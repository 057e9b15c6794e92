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

//! Run configuration
//!
//! Loaded from a TOML file; every key is optional.
//!
//! ```toml
//! machine = "gba"
//! step_cycles = 4
//! run_cycles = 1_000_000
//! halt_skip = true
//! save_state = "run.state"
//!
//! [gb]
//! double_speed = false
//!
//! [n64]
//! dac_rate = 1103
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{EmulatorError, Result};
use super::machine::MachineKind;
use super::n64::ai::DEFAULT_DAC_RATE;

/// 8-bit handheld options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbConfig {
    /// Start in CGB double-speed mode
    pub double_speed: bool,
}

/// Home console options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct N64Config {
    /// AI_DACRATE programmed at start-up
    pub dac_rate: u32,
}

impl Default for N64Config {
    fn default() -> Self {
        Self {
            dac_rate: DEFAULT_DAC_RATE,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub machine: MachineKind,

    /// Cycles per `tick` call, standing in for one CPU instruction
    pub step_cycles: u64,

    /// Total cycles to run
    pub run_cycles: u64,

    /// Jump straight to the next event instead of stepping
    pub halt_skip: bool,

    /// Where to write the save state at the end of a run
    pub save_state: Option<PathBuf>,

    pub gb: GbConfig,
    pub n64: N64Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            machine: MachineKind::Gb,
            step_cycles: 4,
            run_cycles: 1_000_000,
            halt_skip: false,
            save_state: None,
            gb: GbConfig::default(),
            n64: N64Config::default(),
        }
    }
}

impl Config {
    /// Read and parse a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the run loop cannot make progress with
    pub fn validate(&self) -> Result<()> {
        if self.step_cycles == 0 {
            return Err(EmulatorError::InvalidConfig(
                "step_cycles must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
