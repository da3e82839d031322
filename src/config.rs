//! # Orbitherm Configuration
//!
//! Compile-time constants governing the control tasks and the scheduler,
//! plus the per-run [`RunConfig`] that selects between the documented
//! behavioral variants. Zero-valued runtime fields fall back to the
//! constants below.

use std::time::Duration;

use crate::task::CoolerMode;

// ---------------------------------------------------------------------------
// Process model
// ---------------------------------------------------------------------------

/// Number of control tasks. Fixed: Reader, Cooler, Telemetry.
pub const NUM_TASKS: usize = 3;

/// Size of each task's general-purpose register file (RV32: x0–x31).
pub const NUM_REGISTERS: usize = 32;

/// Per-task stack size in bytes. Only used to lay out the initial stack
/// pointers; tasks never push onto a real stack.
pub const STACK_SIZE: u32 = 512;

/// Base address of the task stack region. Task `i` owns
/// `[STACK_BASE + i * STACK_SIZE, STACK_BASE + (i + 1) * STACK_SIZE)`.
pub const STACK_BASE: u32 = 0x8000_4000;

// ---------------------------------------------------------------------------
// Thermal control
// ---------------------------------------------------------------------------

/// Cooling is demanded once temperature rises strictly above this value.
pub const COOLING_ON_ABOVE: i32 = 90;

/// Cooling demand is released once temperature falls strictly below this value.
pub const COOLING_OFF_BELOW: i32 = 55;

/// Maximum number of samples in an input sequence (the reference loader
/// buffer size).
pub const MAX_SAMPLES: usize = 500;

// ---------------------------------------------------------------------------
// Instrumentation
// ---------------------------------------------------------------------------

/// Capacity of the snapshot buffer. Recording stops once full.
pub const SNAPSHOT_CAPACITY: usize = 100;

/// Default snapshot cadence: one snapshot every 5 samples (simulated
/// 5-minute readings), plus the final sample.
pub const SNAPSHOT_INTERVAL: usize = 5;

/// Cycles a task may retire before a hypothetical timer interrupt would
/// have preempted it. Drives `interrupt_count`.
pub const TIME_SLICE_CYCLES: u64 = 32;

// ---------------------------------------------------------------------------
// Concurrent model
// ---------------------------------------------------------------------------

/// Reader polling period in the concurrent model (10 ms in the reference).
pub const READER_PERIOD: Duration = Duration::from_millis(10);

/// Cooler and Telemetry polling period in the concurrent model.
pub const POLL_PERIOD: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// What the kernel does with a scenario identifier outside `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScenarioPolicy {
    /// Fail the run with `KernelError::InvalidScenario`.
    #[default]
    Reject,
    /// Run the baseline scenario instead and log a warning.
    FallbackToBaseline,
}

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Cooler task variant.
    pub cooler_mode: CoolerMode,

    /// Handling of out-of-range scenario identifiers.
    pub scenario_policy: ScenarioPolicy,

    /// Snapshot cadence in samples. `0` means [`SNAPSHOT_INTERVAL`].
    pub snapshot_interval: usize,

    /// Timer-interrupt proxy granularity. `0` means [`TIME_SLICE_CYCLES`].
    pub time_slice_cycles: u64,

    /// Reader sleep between iterations in the concurrent model.
    /// `Duration::ZERO` yields the host thread instead of sleeping.
    pub reader_period: Duration,

    /// Cooler/Telemetry sleep between polls in the concurrent model.
    pub poll_period: Duration,
}

impl RunConfig {
    /// Configuration for the concurrent model that never sleeps. Used by
    /// tests and fast batch runs.
    pub fn unthrottled() -> Self {
        Self {
            reader_period: Duration::ZERO,
            poll_period: Duration::ZERO,
            ..Self::default()
        }
    }

    #[inline]
    pub const fn effective_snapshot_interval(&self) -> usize {
        if self.snapshot_interval > 0 {
            self.snapshot_interval
        } else {
            SNAPSHOT_INTERVAL
        }
    }

    #[inline]
    pub const fn effective_time_slice(&self) -> u64 {
        if self.time_slice_cycles > 0 {
            self.time_slice_cycles
        } else {
            TIME_SLICE_CYCLES
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cooler_mode: CoolerMode::Mirror,
            scenario_policy: ScenarioPolicy::Reject,
            snapshot_interval: SNAPSHOT_INTERVAL,
            time_slice_cycles: TIME_SLICE_CYCLES,
            reader_period: READER_PERIOD,
            poll_period: POLL_PERIOD,
        }
    }
}
