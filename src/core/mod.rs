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

//! Core emulation components
//!
//! This module contains the timing model of every supported machine:
//! - Event scheduler and dispatch (shared)
//! - PSG channels and serial shift register (shared by the handhelds)
//! - Game Boy, Game Boy Advance and Nintendo 64 timed peripherals
//! - Machine selection, configuration and save states

pub mod config;
pub mod error;
pub mod gb;
pub mod gba;
pub mod machine;
pub mod n64;
pub mod psg;
pub mod save_state;
pub mod sio;
pub mod timing;

// Re-export commonly used types
pub use config::Config;
pub use error::{EmulatorError, Result, SaveStateError};
pub use machine::{Machine, MachineKind};
pub use save_state::SaveState;
pub use timing::{Cycles, EventDispatch, EventKind, Scheduler, Timestamp};
