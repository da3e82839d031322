//! # Orbitherm Host
//!
//! Loads a temperature sequence from a file, runs one scenario on the
//! kernel and prints the periodic readings table and final statistics.
//!
//! ```text
//! orbitherm temperatures.txt --scenario 2 --cooler active-wait -v
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use orbitherm::config::{RunConfig, ScenarioPolicy, MAX_SAMPLES};
use orbitherm::task::{CoolerMode, TaskId};
use orbitherm::RunResult;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CoolerArg {
    Mirror,
    ActiveWait,
}

impl From<CoolerArg> for CoolerMode {
    fn from(arg: CoolerArg) -> Self {
        match arg {
            CoolerArg::Mirror => CoolerMode::Mirror,
            CoolerArg::ActiveWait => CoolerMode::ActiveWait,
        }
    }
}

/// Satellite thermal-control kernel simulation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File of whitespace-separated integer temperatures
    #[arg()]
    input: PathBuf,

    /// Scheduler scenario: 1 (P1→P2→P3), 2 (P1→P3→P2), 3 (P2→P1→P3), 4 (concurrent)
    #[arg(short, long, default_value_t = 1)]
    scenario: i64,

    /// Cooler task variant
    #[arg(short, long, value_enum, default_value_t = CoolerArg::Mirror)]
    cooler: CoolerArg,

    /// Run scenario 1 instead of failing on an invalid scenario
    #[arg(long)]
    fallback: bool,

    /// Record a snapshot every N samples
    #[arg(short, long, default_value_t = orbitherm::config::SNAPSHOT_INTERVAL)]
    interval: usize,

    /// Do not sleep between polls in the concurrent scenario
    #[arg(long)]
    unthrottled: bool,

    /// enable debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter(None, log::LevelFilter::Debug);
    } else {
        builder.filter(None, log::LevelFilter::Info);
    }
    builder.init();

    let samples = load_samples(&args.input)?;
    info!(
        "loaded {} samples from {}",
        samples.len(),
        args.input.display()
    );
    if let (Some(min), Some(max)) = (samples.iter().min(), samples.iter().max()) {
        info!("temperature range {min}..={max}");
    }

    let base = if args.unthrottled {
        RunConfig::unthrottled()
    } else {
        RunConfig::default()
    };
    let config = RunConfig {
        cooler_mode: args.cooler.into(),
        scenario_policy: if args.fallback {
            ScenarioPolicy::FallbackToBaseline
        } else {
            ScenarioPolicy::Reject
        },
        snapshot_interval: args.interval,
        ..base
    };

    let result = orbitherm::start_with(&samples, args.scenario, &config)
        .with_context(|| format!("scenario {} failed", args.scenario))?;
    report(&result);
    Ok(())
}

/// Read integers until the first token that does not parse, keeping at
/// most [`MAX_SAMPLES`].
fn load_samples(path: &Path) -> Result<Vec<i32>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut samples: Vec<i32> = text
        .split_whitespace()
        .map_while(|tok| tok.parse().ok())
        .collect();
    if samples.len() > MAX_SAMPLES {
        warn!(
            "{} samples in {}, keeping the first {}",
            samples.len(),
            path.display(),
            MAX_SAMPLES
        );
        samples.truncate(MAX_SAMPLES);
    }
    Ok(samples)
}

fn report(result: &RunResult) {
    println!("Scenario {}: {}", result.scenario.id(), result.scenario);
    println!(
        "{:<8} {:<8} {:<13} {:<15} {:<10}",
        "Sample", "Temp", "Cooling_Flag", "Cooling_State", "UART_Last"
    );
    println!("{}", "-".repeat(55));
    for s in &result.snapshots {
        println!(
            "{:<8} {:<8} {:<13} {:<15} {:<10}",
            s.cursor, s.temperature, s.cooling_flag as u8, s.cooling_state as u8, s.uart_last
        );
    }
    if result.snapshots_dropped > 0 {
        println!("({} snapshots not recorded)", result.snapshots_dropped);
    }

    println!();
    println!("Samples processed:   {}/{}", result.cursor(), result.samples);
    println!("Final temperature:   {}", result.state.temperature);
    println!("cooling_flag:        {}", result.state.cooling_flag as u8);
    println!("cooling_state:       {}", result.state.cooling_state as u8);
    println!("Last UART value:     {}", result.state.uart_last);
    println!();
    println!(
        "{:<10} {:<11} {:>9} {:>11} {:>10}",
        "Task", "State", "Switches", "Interrupts", "Cycles"
    );
    for task in TaskId::ALL {
        let t = result.task(task);
        println!(
            "{:<10} {:<11} {:>9} {:>11} {:>10}",
            task.name(),
            format!("{:?}", t.state),
            t.context_switch_count,
            t.interrupt_count,
            t.cycle_count
        );
    }
    let stats = result.stats;
    println!();
    println!(
        "dispatches {}  context switches {}  syscalls {}  interrupts {}  cycles {}",
        stats.dispatches, stats.context_switches, stats.syscalls, stats.interrupts, stats.cycles
    );
    println!(
        "elapsed {:?}  syscalls/s {:.1}  interrupts/s {:.1}",
        result.elapsed,
        stats.syscall_rate(result.elapsed),
        stats.interrupt_rate(result.elapsed)
    );
}
