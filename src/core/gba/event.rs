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

//! Game Boy Advance event kinds

use crate::core::timing::EventKind;

/// Scheduled event slots of the Game Boy Advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GbaEvent {
    /// HDraw/HBlank boundary
    Ppu,
    /// Mixer down-sample tick
    ApuSample,
    ApuChannel1,
    ApuChannel2,
    ApuChannel3,
    ApuChannel4,
    /// Timer overflow, one slot per timer
    Timer0,
    Timer1,
    Timer2,
    Timer3,
    /// DMA completion, one slot per channel
    Dma0,
    Dma1,
    Dma2,
    Dma3,
    /// SIO bit clock
    Serial,
}

impl GbaEvent {
    /// APU channel event for channel `index` (0-3)
    pub fn apu_channel(index: usize) -> GbaEvent {
        match index {
            0 => GbaEvent::ApuChannel1,
            1 => GbaEvent::ApuChannel2,
            2 => GbaEvent::ApuChannel3,
            _ => GbaEvent::ApuChannel4,
        }
    }

    /// Overflow event of timer `index` (0-3)
    pub fn timer(index: usize) -> GbaEvent {
        match index {
            0 => GbaEvent::Timer0,
            1 => GbaEvent::Timer1,
            2 => GbaEvent::Timer2,
            _ => GbaEvent::Timer3,
        }
    }

    /// Completion event of DMA channel `index` (0-3)
    pub fn dma(index: usize) -> GbaEvent {
        match index {
            0 => GbaEvent::Dma0,
            1 => GbaEvent::Dma1,
            2 => GbaEvent::Dma2,
            _ => GbaEvent::Dma3,
        }
    }
}

impl EventKind for GbaEvent {
    const COUNT: usize = 15;
    const ALL: &'static [Self] = &[
        GbaEvent::Ppu,
        GbaEvent::ApuSample,
        GbaEvent::ApuChannel1,
        GbaEvent::ApuChannel2,
        GbaEvent::ApuChannel3,
        GbaEvent::ApuChannel4,
        GbaEvent::Timer0,
        GbaEvent::Timer1,
        GbaEvent::Timer2,
        GbaEvent::Timer3,
        GbaEvent::Dma0,
        GbaEvent::Dma1,
        GbaEvent::Dma2,
        GbaEvent::Dma3,
        GbaEvent::Serial,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            GbaEvent::Ppu => "Ppu",
            GbaEvent::ApuSample => "ApuSample",
            GbaEvent::ApuChannel1 => "ApuChannel1",
            GbaEvent::ApuChannel2 => "ApuChannel2",
            GbaEvent::ApuChannel3 => "ApuChannel3",
            GbaEvent::ApuChannel4 => "ApuChannel4",
            GbaEvent::Timer0 => "Timer0",
            GbaEvent::Timer1 => "Timer1",
            GbaEvent::Timer2 => "Timer2",
            GbaEvent::Timer3 => "Timer3",
            GbaEvent::Dma0 => "Dma0",
            GbaEvent::Dma1 => "Dma1",
            GbaEvent::Dma2 => "Dma2",
            GbaEvent::Dma3 => "Dma3",
            GbaEvent::Serial => "Serial",
        }
    }
}
