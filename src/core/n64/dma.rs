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

//! PI, SI and SP DMA engines
//!
//! Each engine moves one block per request and reports completion through a
//! one-shot event. The byte copy itself belongs to the memory system; only
//! the busy window is timed here. Transfer costs are bus-rate estimates:
//!
//! ```text
//! Engine | Setup (cycles) | Per 8 bytes
//! -------|----------------|------------
//! PI     | 256            | 38
//! SI     | 2304 (fixed 64-byte PIF block)
//! SP     | 16             | 1
//! ```

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::core::timing::Cycles;

/// Which DMA engine a [`DmaEngine`] models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum DmaBus {
    /// Parallel interface (cartridge)
    Pi,
    /// Serial interface (PIF RAM)
    Si,
    /// Signal processor memory
    Sp,
}

impl DmaBus {
    /// Busy window for a transfer of `length` bytes
    pub fn transfer_cycles(self, length: u32) -> Cycles {
        let words = Cycles::from(length).div_ceil(8);
        match self {
            DmaBus::Pi => 256 + 38 * words,
            DmaBus::Si => 2304,
            DmaBus::Sp => 16 + words,
        }
    }
}

/// One DMA engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DmaEngine {
    bus: DmaBus,

    dram_address: u32,

    /// Device-side address (cartridge, PIF or RSP memory)
    device_address: u32,

    /// Bytes in the transfer in flight
    length: u32,

    busy: bool,

    /// Bytes moved by completed transfers
    transferred: u64,
}

impl DmaEngine {
    pub fn new(bus: DmaBus) -> Self {
        Self {
            bus,
            dram_address: 0,
            device_address: 0,
            length: 0,
            busy: false,
            transferred: 0,
        }
    }

    #[inline]
    pub fn bus(&self) -> DmaBus {
        self.bus
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    #[inline]
    pub fn dram_address(&self) -> u32 {
        self.dram_address
    }

    #[inline]
    pub fn device_address(&self) -> u32 {
        self.device_address
    }

    #[inline]
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn write_dram_address(&mut self, value: u32) {
        self.dram_address = value & 0x00FF_FFFF;
    }

    pub fn write_device_address(&mut self, value: u32) {
        self.device_address = value;
    }

    /// Start a transfer of `length` bytes
    ///
    /// Returns the busy window, or `None` when a transfer is already in
    /// flight (the request is dropped).
    pub fn start(&mut self, length: u32) -> Option<Cycles> {
        if self.busy {
            log::debug!("{:?} DMA: request while busy ignored", self.bus);
            return None;
        }

        self.length = length;
        self.busy = true;
        Some(self.bus.transfer_cycles(length))
    }

    /// Completion handler
    pub fn finish(&mut self) {
        self.transferred += u64::from(self.length);
        self.dram_address = self.dram_address.wrapping_add(self.length) & 0x00FF_FFFF;
        self.length = 0;
        self.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_cost_per_bus() {
        assert_eq!(DmaBus::Pi.transfer_cycles(0x1000), 256 + 38 * 512);
        assert_eq!(DmaBus::Si.transfer_cycles(64), 2304);
        assert_eq!(DmaBus::Sp.transfer_cycles(0x1000), 16 + 512);
    }

    #[test]
    fn test_busy_engine_drops_second_request() {
        let mut dma = DmaEngine::new(DmaBus::Pi);
        dma.write_dram_address(0x1000);
        assert!(dma.start(0x100).is_some());
        assert_eq!(dma.start(0x100), None);

        dma.finish();
        assert!(!dma.is_busy());
        assert_eq!(dma.transferred(), 0x100);
        assert_eq!(dma.dram_address(), 0x1100);
    }
}
