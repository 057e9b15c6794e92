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

//! Step-size independence with the audio FIFO, DMA and compare armed

use super::super::*;
use crate::core::timing::{EventDispatch, EventKind, Timestamp};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Setup {
    dac_rate: u32,
    buffers: [u32; 2],
    pi_length: u32,
    compare: u32,
    v_intr: u32,
}

fn setup() -> impl Strategy<Value = Setup> {
    (
        100..1_200u32,
        [8..0x800u32, 8..0x800u32],
        0..0x10000u32,
        0..1_000_000u32,
        0..0x20Du32,
    )
        .prop_map(|(dac_rate, buffers, pi_length, compare, v_intr)| Setup {
            dac_rate,
            buffers,
            pi_length,
            compare,
            v_intr,
        })
}

fn armed(setup: &Setup) -> N64System {
    let mut n64 = N64System::new();
    n64.write_register(MI_INTR_MASK, 0xAAA);
    n64.write_register(VI_V_INTR, setup.v_intr);

    n64.write_register(AI_CONTROL, 1);
    n64.write_register(AI_DACRATE, setup.dac_rate);
    for length in setup.buffers {
        n64.write_register(AI_LEN, length);
    }

    n64.write_register(PI_RD_LEN, setup.pi_length);
    n64.write_register(SI_PIF_AD_RD64B, 0x1FC0_07C0);
    n64.write_cop0_compare(setup.compare);
    n64
}

fn due_times(n64: &N64System) -> Vec<(&'static str, Timestamp)> {
    let mut due: Vec<_> = n64
        .scheduler
        .pending()
        .map(|event| (event.kind.name(), event.due))
        .collect();
    due.sort_unstable();
    due
}

fn observe(n64: &N64System) -> (Vec<u32>, u32, u8, u64, u64) {
    let registers = [
        MI_INTR,
        AI_LEN,
        AI_STATUS,
        VI_V_CURRENT,
        PI_STATUS,
        SI_STATUS,
        SP_STATUS,
    ]
    .into_iter()
    .map(|address| n64.read_register(address))
    .collect();
    (
        registers,
        n64.cop0_count(),
        n64.cause_ip(),
        n64.ai().buffers_played(),
        n64.ai().sample_count(),
    )
}

proptest! {
    #[test]
    fn armed_peripherals_ignore_step_sizes(
        setup in setup(),
        steps in prop::collection::vec(1..60_000u64, 1..40),
    ) {
        let mut whole = armed(&setup);
        let mut split = whole.clone();

        let total: Cycles = steps.iter().sum();
        whole.tick(total);
        for step in &steps {
            split.tick(*step);
        }

        prop_assert_eq!(due_times(&split), due_times(&whole));
        prop_assert_eq!(observe(&split), observe(&whole));
    }
}
