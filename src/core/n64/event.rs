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

//! Nintendo 64 event kinds

use crate::core::timing::EventKind;

/// Scheduled event slots of the Nintendo 64
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum N64Event {
    /// Video interface line advance
    Vi,
    /// Audio DAC sample clock
    AiSample,
    /// End of the audio buffer at the head of the FIFO
    AiDma,
    /// CP0 COUNT reaching COMPARE
    CompareTimer,
    /// Cartridge bus DMA completion
    PiDma,
    /// PIF RAM DMA completion
    SiDma,
    /// RSP memory DMA completion
    SpDma,
}

impl EventKind for N64Event {
    const COUNT: usize = 7;
    const ALL: &'static [Self] = &[
        N64Event::Vi,
        N64Event::AiSample,
        N64Event::AiDma,
        N64Event::CompareTimer,
        N64Event::PiDma,
        N64Event::SiDma,
        N64Event::SpDma,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            N64Event::Vi => "Vi",
            N64Event::AiSample => "AiSample",
            N64Event::AiDma => "AiDma",
            N64Event::CompareTimer => "CompareTimer",
            N64Event::PiDma => "PiDma",
            N64Event::SiDma => "SiDma",
            N64Event::SpDma => "SpDma",
        }
    }
}
