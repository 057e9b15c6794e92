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

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};
use serde::Serialize;

use retrocore::core::config::Config;
use retrocore::core::error::Result;
use retrocore::core::machine::{Machine, MachineKind, PendingEvent};
use retrocore::core::save_state::SaveState;

/// Drive one machine's event scheduler without a CPU attached
#[derive(Parser)]
#[command(name = "retrocore")]
#[command(about = "Cycle-accurate event scheduler runner", long_about = None)]
struct Args {
    /// TOML config file (falls back to $RETROCORE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Machine to run: gb, gba or n64 (falls back to $RETROCORE_MACHINE)
    #[arg(short, long)]
    machine: Option<String>,

    /// Total cycles to run
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Cycles per step
    #[arg(short, long)]
    step: Option<u64>,

    /// Jump from event to event instead of stepping
    #[arg(long)]
    halt_skip: bool,

    /// Save state to restore before running
    #[arg(long)]
    load: Option<PathBuf>,

    /// Where to write a save state after running
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Serialize)]
struct Summary {
    machine: MachineKind,
    cycles: u64,
    frames: u64,
    pending: Vec<PendingEvent>,
}

fn resolve_config(args: &Args) -> Result<Config> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os("RETROCORE_CONFIG").map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };

    let machine = args
        .machine
        .clone()
        .or_else(|| std::env::var("RETROCORE_MACHINE").ok());
    if let Some(name) = machine {
        config.machine = name.parse()?;
    }
    if let Some(cycles) = args.cycles {
        config.run_cycles = cycles;
    }
    if let Some(step) = args.step {
        config.step_cycles = step.max(1);
    }
    if args.halt_skip {
        config.halt_skip = true;
    }
    if args.save.is_some() {
        config.save_state = args.save.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize logger with default level INFO
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("retrocore v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = resolve_config(&args)?;
    let mut machine = Machine::from_config(&config);

    if let Some(path) = &args.load {
        match SaveState::load_from_file(path) {
            Ok(state) => {
                machine.restore_or_reset(&state);
            }
            Err(e) => warn!("Failed to read save state {}: {}", path.display(), e),
        }
    }

    info!(
        "Running {} for {} cycles ({})",
        config.machine,
        config.run_cycles,
        if config.halt_skip {
            "event to event".to_string()
        } else {
            format!("{}-cycle steps", config.step_cycles)
        }
    );

    let mut ran = 0;
    while ran < config.run_cycles {
        if config.halt_skip {
            match machine.skip_to_event() {
                Some(cycles) => ran += cycles,
                None => break,
            }
        } else {
            let step = config.step_cycles.min(config.run_cycles - ran);
            machine.step(step);
            ran += step;
        }
    }

    info!(
        "Stopped at cycle {} after {} frames",
        machine.now(),
        machine.frame_count()
    );

    if let Some(path) = &config.save_state {
        machine.save_state().save_to_file(path)?;
        info!("Save state written to {}", path.display());
    }

    let summary = Summary {
        machine: machine.kind(),
        cycles: machine.now(),
        frames: machine.frame_count(),
        pending: machine.pending_events(),
    };
    let json = serde_json::to_string_pretty(&summary).map_err(std::io::Error::from)?;
    println!("{json}");

    Ok(())
}
