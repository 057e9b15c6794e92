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

//! Cycle-accurate event scheduling core
//!
//! This library provides the timing model shared by three emulated machines:
//! an 8-bit handheld, a 32-bit handheld and a 64-bit home console. Each one
//! owns a [`core::timing::Scheduler`] that fires peripheral events at exact
//! cycle counts while the processor core drives time forward.
//!
//! # Example
//!
//! ```
//! use retrocore::core::machine::{Machine, MachineKind};
//!
//! let mut machine = Machine::new(MachineKind::Gba);
//! machine.step(1_000);
//! assert_eq!(machine.now(), 1_000);
//!
//! machine.run_frame();
//! assert_eq!(machine.frame_count(), 1);
//! ```

pub mod core;
