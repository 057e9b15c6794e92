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

//! OAM DMA
//!
//! A write to 0xFF46 copies 160 bytes from `value << 8` into OAM over 160
//! M-cycles. The source block is latched when the transfer starts and lands
//! in OAM in one piece when the completion event fires.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::Cycles;

/// Bytes of object attribute memory
pub const OAM_SIZE: usize = 160;

/// Transfer length in T-cycles
pub const TRANSFER_CYCLES: Cycles = 640;

/// OAM DMA controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct OamDma {
    /// Last value written to 0xFF46
    source: u8,

    /// Bytes latched from the source page
    latched: Vec<u8>,

    active: bool,
}

impl OamDma {
    pub fn new() -> Self {
        Self {
            source: 0xFF,
            latched: Vec::new(),
            active: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Source page register (0xFF46)
    #[inline]
    pub fn source(&self) -> u8 {
        self.source
    }

    /// Start a transfer of `block`, returning its length in ticks
    ///
    /// * `unit` - Time base ticks per T-cycle
    pub fn start(&mut self, source: u8, block: Vec<u8>, unit: Cycles) -> Cycles {
        debug_assert_eq!(block.len(), OAM_SIZE);
        self.source = source;
        self.latched = block;
        self.active = true;
        TRANSFER_CYCLES * unit
    }

    /// Completion handler: copy the latched block into `oam`
    pub fn finish(&mut self, oam: &mut [u8]) {
        let len = self.latched.len().min(oam.len());
        oam[..len].copy_from_slice(&self.latched[..len]);
        self.latched.clear();
        self.active = false;
    }
}

impl Default for OamDma {
    fn default() -> Self {
        Self::new()
    }
}
