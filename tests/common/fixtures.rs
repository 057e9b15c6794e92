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

//! Test fixtures for common test scenarios

use retrocore::core::config::Config;
use retrocore::core::machine::{Machine, MachineKind};
use retrocore::core::timing::{Cycles, EventDispatch, EventKind, Handler, Scheduler, Timestamp};

/// Event kinds for the scheduler scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    A,
    B,
    C,
}

impl EventKind for Pulse {
    const COUNT: usize = 3;
    const ALL: &'static [Self] = &[Pulse::A, Pulse::B, Pulse::C];

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Pulse::A => "A",
            Pulse::B => "B",
            Pulse::C => "C",
        }
    }
}

/// Handler invocation log entry: kind, elapsed, time of dispatch
pub type Fired = (Pulse, Cycles, Timestamp);

/// Machine whose handlers only record what fired
#[derive(Debug, Clone)]
pub struct PulseMachine {
    pub scheduler: Scheduler<Pulse>,
    pub fired: Vec<Fired>,
    pub period: [Option<Cycles>; Pulse::COUNT],
    pub alignment: Cycles,
}

impl PulseMachine {
    pub fn new() -> Self {
        Self {
            scheduler: Scheduler::new(),
            fired: Vec::new(),
            period: [None; Pulse::COUNT],
            alignment: 1,
        }
    }

    /// Make `kind` re-arm itself every `period` cycles
    #[allow(dead_code)]
    pub fn periodic(mut self, kind: Pulse, period: Cycles) -> Self {
        self.period[kind.index()] = Some(period);
        self
    }

    fn record(&mut self, kind: Pulse, elapsed: Cycles) {
        self.fired.push((kind, elapsed, self.scheduler.now()));
        if let Some(period) = self.period[kind.index()] {
            self.scheduler.schedule(kind, period);
        }
    }
}

fn on_a(machine: &mut PulseMachine, elapsed: Cycles) {
    machine.record(Pulse::A, elapsed);
}

fn on_b(machine: &mut PulseMachine, elapsed: Cycles) {
    machine.record(Pulse::B, elapsed);
}

fn on_c(machine: &mut PulseMachine, elapsed: Cycles) {
    machine.record(Pulse::C, elapsed);
}

impl EventDispatch for PulseMachine {
    type Kind = Pulse;

    const HANDLERS: &'static [Handler<Self>] = &[on_a, on_b, on_c];

    fn scheduler(&self) -> &Scheduler<Pulse> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<Pulse> {
        &mut self.scheduler
    }

    fn alignment(&self) -> Cycles {
        self.alignment
    }
}

/// One fresh machine of every kind
#[allow(dead_code)]
pub fn all_machines() -> Vec<Machine> {
    MachineKind::ALL.into_iter().map(Machine::new).collect()
}

/// Config for `kind` with everything else at its default
#[allow(dead_code)]
pub fn config_for(kind: MachineKind) -> Config {
    Config {
        machine: kind,
        ..Config::default()
    }
}
