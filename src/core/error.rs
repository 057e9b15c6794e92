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

/// Emulator error types
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown machine: {0} (expected one of: gb, gba, n64)")]
    UnknownMachine(String),

    #[error("Save state error: {0}")]
    SaveState(#[from] SaveStateError),
}

/// Save state specific error types
///
/// Every variant is a recoverable load failure: the caller is expected to
/// discard the state and fall back to a clean reset.
#[derive(Error, Debug)]
pub enum SaveStateError {
    #[error("Incompatible save state version: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("Save state belongs to a different machine: expected {expected}, got {got}")]
    MachineMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Corrupted scheduler state: {0}")]
    CorruptedScheduler(String),

    #[error("Corrupted {component} state: {reason}")]
    CorruptedComponent {
        component: &'static str,
        reason: String,
    },

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl SaveStateError {
    /// Shorthand for a scheduler validation failure
    pub(crate) fn scheduler(reason: impl Into<String>) -> Self {
        SaveStateError::CorruptedScheduler(reason.into())
    }

    /// Shorthand for a client component validation failure
    pub(crate) fn component(component: &'static str, reason: impl Into<String>) -> Self {
        SaveStateError::CorruptedComponent {
            component,
            reason: reason.into(),
        }
    }
}
