//! # Orbitherm — Satellite Thermal-Control Kernel
//!
//! A single-core controller model running three cooperating control tasks
//! over a satellite thermal sensor stream, under a scenario-driven
//! scheduler.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                Host (main.rs, tests)                    │
//! ├────────────────────────────────────────────────────────┤
//! │            Kernel API (kernel.rs)                       │
//! │        start() · start_with() · Kernel::schedule()      │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │  Instrumentation   │  Sync Primitives  │
//! │  scheduler.rs│  instrument.rs     │  sync.rs          │
//! │  ─ scenarios │  ─ counters        │  ─ critical_section│
//! │  ─ dispatch()│  ─ snapshots       │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │   Task Bodies (programs.rs)   ·   PCB Store (task.rs)  │
//! │   Reader · Cooler · Telemetry     Context · counters   │
//! ├────────────────────────────────────────────────────────┤
//! │   Shared State Region (memory_map.rs)                   │
//! │   temperature · cooling flag/state · UART · cursor      │
//! ├────────────────────────────────────────────────────────┤
//! │   Arch Model (arch/rv32.rs) — register file, cycles    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Control Loop
//!
//! - **Reader (P1)** reads the next sample, publishes it as the current
//!   temperature, applies the cooling hysteresis (on above 90, off below
//!   55) and stages the sample for telemetry.
//! - **Cooler (P2)** drives the cooling actuator state from the demand
//!   flag.
//! - **Telemetry (P3)** relays staged samples over the UART.
//!
//! ## Memory Model
//!
//! - The shared state region is lock-free: relaxed atomics standing in
//!   for memory-mapped registers. Interleavings are part of the behavior.
//! - Three fixed PCBs, created at boot. No dynamic task creation.
//! - The instrumentation collector is the only state behind a critical
//!   section.
//!
//! ## Example
//!
//! ```
//! let result = orbitherm::start(&[50, 95, 60, 40, 100], 1).unwrap();
//! assert_eq!(result.cursor(), 5);
//! assert_eq!(result.state.uart_last, 100);
//! ```

pub mod arch;
pub mod config;
pub mod error;
pub mod instrument;
pub mod kernel;
pub mod memory_map;
pub mod programs;
pub mod scheduler;
pub mod sync;
pub mod task;

pub use config::RunConfig;
pub use error::KernelError;
pub use kernel::{start, start_with, Completion, RunResult};
pub use scheduler::Scenario;
