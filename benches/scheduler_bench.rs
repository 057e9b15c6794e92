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

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use retrocore::core::gba::GbaEvent;
use retrocore::core::machine::{Machine, MachineKind};
use retrocore::core::timing::{EventKind, Scheduler};
use std::hint::black_box;

fn scheduler_churn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");

    // Re-arm every kind with a new duration; the heap stays full
    group.bench_function("reschedule_full_queue", |b| {
        let mut scheduler = Scheduler::<GbaEvent>::new();
        for (i, &kind) in GbaEvent::ALL.iter().enumerate() {
            scheduler.schedule(kind, 100 + i as u64);
        }

        let mut n = 0u64;
        b.iter(|| {
            for &kind in GbaEvent::ALL {
                n = n.wrapping_mul(6364136223846793005).wrapping_add(1);
                scheduler.schedule(kind, black_box(1 + (n >> 54)));
            }
        });
    });

    group.bench_function("remove_insert", |b| {
        let mut scheduler = Scheduler::<GbaEvent>::new();
        for (i, &kind) in GbaEvent::ALL.iter().enumerate() {
            scheduler.schedule(kind, 100 + i as u64);
        }

        b.iter(|| {
            let event = scheduler.remove_silent(black_box(GbaEvent::Timer2));
            if let Some(event) = event {
                scheduler.insert_silent(event);
            }
        });
    });

    group.bench_function("advance_and_pop", |b| {
        let mut scheduler = Scheduler::<GbaEvent>::new();
        b.iter(|| {
            for (i, &kind) in GbaEvent::ALL.iter().enumerate() {
                scheduler.schedule(kind, i as u64 + 1);
            }
            scheduler.advance(GbaEvent::COUNT as u64);
            while let Some(popped) = scheduler.pop_due() {
                black_box(popped);
            }
        });
    });

    group.finish();
}

fn machine_frame_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_frame");
    group.sample_size(20);

    for kind in MachineKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            let mut machine = Machine::new(kind);
            b.iter(|| black_box(machine.run_frame()));
        });
    }

    group.finish();
}

fn stepping_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("gba_100k_cycles");
    group.sample_size(20);

    for step in [1u64, 4, 16] {
        group.bench_with_input(BenchmarkId::new("step", step), &step, |b, &step| {
            let mut machine = Machine::new(MachineKind::Gba);
            b.iter(|| {
                for _ in 0..100_000 / step {
                    machine.step(step);
                }
            });
        });
    }

    group.bench_function("skip_to_event", |b| {
        let mut machine = Machine::new(MachineKind::Gba);
        b.iter(|| {
            let target = machine.now() + 100_000;
            while machine.now() < target {
                black_box(machine.skip_to_event());
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    scheduler_churn_benchmark,
    machine_frame_benchmark,
    stepping_benchmark
);
criterion_main!(benches);
