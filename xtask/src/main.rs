use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for retrocore")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks (fmt, clippy, test)
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Run tests, optionally limited to one area
    Test {
        #[arg(value_enum)]
        area: Option<Area>,
    },
    /// Run the randomized timing checks with many more cases, in release mode
    Soak {
        /// Cases per property
        #[arg(long, default_value = "2000")]
        cases: u32,
    },
    /// Run benchmarks
    Bench {
        /// Only run benchmarks whose name contains this
        filter: Option<String>,
    },
    /// Run one machine and print the pending events
    Run {
        /// Machine to run (gb, gba or n64)
        #[arg(default_value = "gba")]
        machine: String,
        /// Number of cycles to run
        #[arg(short = 'n', long, default_value = "1000000")]
        cycles: u64,
        /// Jump from event to event instead of stepping
        #[arg(long)]
        halt_skip: bool,
        #[arg(long)]
        release: bool,
    },
}

/// Test areas, by library module
#[derive(Clone, Copy, ValueEnum)]
enum Area {
    Timing,
    Gb,
    Gba,
    N64,
    /// Integration tests under tests/
    Scenarios,
}

impl Area {
    fn label(self) -> &'static str {
        match self {
            Area::Timing => "Timing",
            Area::Gb => "Game Boy",
            Area::Gba => "Game Boy Advance",
            Area::N64 => "Nintendo 64",
            Area::Scenarios => "Scenario",
        }
    }

    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Area::Timing => &["--lib", "core::timing"],
            // Trailing separator keeps gba out of the gb run
            Area::Gb => &["--lib", "core::gb::"],
            Area::Gba => &["--lib", "core::gba"],
            Area::N64 => &["--lib", "core::n64"],
            Area::Scenarios => &["--tests"],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { verbose } => run_ci(verbose),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Test { area } => run_test(area),
        Commands::Soak { cases } => run_soak(cases),
        Commands::Bench { filter } => run_bench(filter.as_deref()),
        Commands::Run {
            machine,
            cycles,
            halt_skip,
            release,
        } => run_machine(&machine, cycles, halt_skip, release),
    }
}

fn run_ci(verbose: bool) -> Result<()> {
    println!("{}", "=== Running CI Pipeline ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;
    run_task("Test", || run_test(None), verbose)?;

    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );

    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = cargo(&["fmt", "--all"]);
    if check {
        cmd.args(["--", "--check"]);
    }
    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    let mut cmd = cargo(&["clippy", "--all-targets", "--all-features"]);
    if fix {
        cmd.arg("--fix");
    } else {
        cmd.args(["--", "-D", "warnings"]);
    }
    execute_command(&mut cmd)
}

fn run_test(area: Option<Area>) -> Result<()> {
    let Some(area) = area else {
        return execute_command(&mut cargo(&["test", "--all-features"]));
    };

    println!("{} Running {} tests...", "→".blue(), area.label().bold());

    let mut cmd = cargo(&["test", "--all-features"]);
    cmd.args(area.cargo_args());
    execute_command(&mut cmd)?;

    println!("{} {} tests passed", "✓".green(), area.label());
    Ok(())
}

fn run_soak(cases: u32) -> Result<()> {
    println!(
        "{} Property tests, {} cases each",
        "→".blue(),
        cases.to_string().bold()
    );

    let mut cmd = cargo(&["test", "--release", "--lib", "--", "properties", "batching"]);
    cmd.env("PROPTEST_CASES", cases.to_string());
    execute_command(&mut cmd)
}

fn run_bench(filter: Option<&str>) -> Result<()> {
    let mut cmd = cargo(&["bench"]);
    if let Some(filter) = filter {
        cmd.args(["--", filter]);
    }
    execute_command(&mut cmd)
}

fn run_machine(machine: &str, cycles: u64, halt_skip: bool, release: bool) -> Result<()> {
    println!(
        "{} {} for {} cycles ({})",
        "→".blue(),
        machine.cyan(),
        cycles.to_string().bold(),
        if release {
            "release".green().bold()
        } else {
            "debug".yellow().bold()
        }
    );

    let start = Instant::now();

    let mut cmd = cargo(&["run", "--bin", "retrocore"]);
    if release {
        cmd.arg("--release");
    }
    cmd.args(["--", "--machine", machine, "-n"])
        .arg(cycles.to_string());
    if halt_skip {
        cmd.arg("--halt-skip");
    }

    execute_command(&mut cmd)?;

    println!(
        "\n{} Run completed in {}",
        "✓".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );

    Ok(())
}

fn cargo(args: &[&str]) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    cmd
}

fn run_task<F>(name: &str, task: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    print!("{} {} ... ", "→".blue(), name);

    let start = Instant::now();

    match task() {
        Ok(_) => {
            let timing = if verbose {
                format!("({:.2}s)", start.elapsed().as_secs_f64())
            } else {
                String::new()
            };
            println!("{} {}", "✓".green().bold(), timing);
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗".red().bold());
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("Command failed with exit code: {}", status);
    }

    Ok(())
}
