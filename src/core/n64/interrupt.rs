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

//! MIPS interface interrupt lines
//!
//! All six lines share CPU interrupt IP2. The CP0 compare interrupt (IP7)
//! is tracked separately by the compare timer.

use bitflags::bitflags;

bitflags! {
    /// MI_INTR / MI_INTR_MASK bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MiInterrupts: u32 {
        const SP = 1 << 0;
        const SI = 1 << 1;
        const AI = 1 << 2;
        const VI = 1 << 3;
        const PI = 1 << 4;
        const DP = 1 << 5;
    }
}

impl MiInterrupts {
    /// Apply an MI_INTR_MASK write: bit 2n clears line n, bit 2n+1 sets it
    pub fn apply_mask_write(self, value: u32) -> MiInterrupts {
        let mut mask = self;
        for (line, flag) in MiInterrupts::all().iter().enumerate() {
            if value & (1 << (2 * line)) != 0 {
                mask.remove(flag);
            }
            if value & (1 << (2 * line + 1)) != 0 {
                mask.insert(flag);
            }
        }
        mask
    }
}
