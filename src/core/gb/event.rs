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

//! Game Boy event kinds

use crate::core::timing::EventKind;

/// Scheduled event slots of the Game Boy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GbEvent {
    /// LCD mode transition
    Ppu,
    /// Mixer down-sample tick
    ApuSample,
    /// Square channel 1 period
    ApuChannel1,
    /// Square channel 2 period
    ApuChannel2,
    /// Wave channel period
    ApuChannel3,
    /// Noise channel period
    ApuChannel4,
    /// TIMA overflow
    Timer,
    /// TMA reload one M-cycle after overflow
    TimerReload,
    /// Serial bit clock
    Serial,
    /// OAM DMA completion
    OamDma,
}

impl GbEvent {
    /// Kinds whose period is measured in CPU clocks and so follows the
    /// double-speed switch
    pub const CLOCK_RELATIVE: &'static [GbEvent] = &[
        GbEvent::Timer,
        GbEvent::TimerReload,
        GbEvent::Serial,
        GbEvent::OamDma,
    ];

    /// APU channel event for channel `index` (0-3)
    pub fn apu_channel(index: usize) -> GbEvent {
        match index {
            0 => GbEvent::ApuChannel1,
            1 => GbEvent::ApuChannel2,
            2 => GbEvent::ApuChannel3,
            _ => GbEvent::ApuChannel4,
        }
    }

    /// Whether the handler re-arms the event itself
    pub fn is_periodic(self) -> bool {
        !matches!(self, GbEvent::TimerReload | GbEvent::OamDma)
    }
}

impl EventKind for GbEvent {
    const COUNT: usize = 10;
    const ALL: &'static [Self] = &[
        GbEvent::Ppu,
        GbEvent::ApuSample,
        GbEvent::ApuChannel1,
        GbEvent::ApuChannel2,
        GbEvent::ApuChannel3,
        GbEvent::ApuChannel4,
        GbEvent::Timer,
        GbEvent::TimerReload,
        GbEvent::Serial,
        GbEvent::OamDma,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            GbEvent::Ppu => "Ppu",
            GbEvent::ApuSample => "ApuSample",
            GbEvent::ApuChannel1 => "ApuChannel1",
            GbEvent::ApuChannel2 => "ApuChannel2",
            GbEvent::ApuChannel3 => "ApuChannel3",
            GbEvent::ApuChannel4 => "ApuChannel4",
            GbEvent::Timer => "Timer",
            GbEvent::TimerReload => "TimerReload",
            GbEvent::Serial => "Serial",
            GbEvent::OamDma => "OamDma",
        }
    }
}
