//! # Process Control Block
//!
//! Defines the process model for Orbitherm. Exactly three processes exist,
//! created when the scheduler is initialized and dropped with it:
//!
//! | Pid | Task      | Role                                         |
//! |-----|-----------|----------------------------------------------|
//! | P1  | Reader    | Reads samples, drives the cooling demand     |
//! | P2  | Cooler    | Mirrors the demand into the cooling actuator |
//! | P3  | Telemetry | Relays staged values over the UART           |
//!
//! Each PCB carries the task's saved [`Context`] and its instrumentation
//! counters. The scheduler owns every PCB and is the only component that
//! writes the saved context.

use crate::arch::rv32::{Context, Cpu, Slice};
use crate::memory_map::SharedState;
use crate::programs;

// ---------------------------------------------------------------------------
// Task identity
// ---------------------------------------------------------------------------

/// One of the three fixed control tasks. The discriminant is the PCB slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    Reader = 0,
    Cooler = 1,
    Telemetry = 2,
}

impl TaskId {
    /// All tasks in PCB-slot order.
    pub const ALL: [TaskId; 3] = [TaskId::Reader, TaskId::Cooler, TaskId::Telemetry];

    /// Index into the PCB store.
    #[inline]
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// Process identifier as the firmware numbers them (P1..P3).
    #[inline]
    pub const fn pid(self) -> u32 {
        self as u32 + 1
    }

    pub const fn name(self) -> &'static str {
        match self {
            TaskId::Reader => "reader",
            TaskId::Cooler => "cooler",
            TaskId::Telemetry => "telemetry",
        }
    }
}

// ---------------------------------------------------------------------------
// Process state machine
// ---------------------------------------------------------------------------

/// Execution state of a process.
///
/// ```text
///   ┌──────────┐   dispatch    ┌─────────┐   exit   ┌────────────┐
///   │  Ready   │ ────────────► │ Running │ ───────► │ Terminated │
///   └──────────┘               └─────────┘          └────────────┘
///        ▲          yield           │
///        └──────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Terminated,
}

// ---------------------------------------------------------------------------
// Cooler variants
// ---------------------------------------------------------------------------

/// Cooler task behavior. The two variants are not equivalent: they differ
/// in when `cooling_state` changes relative to `cooling_flag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoolerMode {
    /// Copy `cooling_flag` into `cooling_state` once per slice.
    #[default]
    Mirror,
    /// Once cooling is demanded, hold `cooling_state` on while polling until
    /// the temperature falls below the safe band, then clear it.
    ActiveWait,
}

impl CoolerMode {
    /// Boot argument placed in `a0` of the Cooler's initial context.
    pub const fn as_arg(self) -> u32 {
        match self {
            CoolerMode::Mirror => 0,
            CoolerMode::ActiveWait => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Process Control Block
// ---------------------------------------------------------------------------

/// Entry point of a task body. Runs one slice on the live CPU.
pub type TaskEntry = fn(&mut Cpu, &SharedState) -> Slice;

/// Process Control Block — saved context and counters for one task.
#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pub task: TaskId,
    pub state: ProcessState,
    pub entry: TaskEntry,
    /// Saved context. Written by the scheduler at every switch-out.
    pub context: Context,

    /// Timer interrupts that would have fired while this task ran.
    pub interrupt_count: u32,
    /// Times this task was switched in.
    pub context_switch_count: u32,
    /// Cycles retired by this task.
    pub cycle_count: u64,
}

impl ProcessControlBlock {
    /// Create the PCB for `task` with its boot context.
    pub fn new(task: TaskId, cooler_mode: CoolerMode) -> Self {
        let arg = match task {
            TaskId::Cooler => cooler_mode.as_arg(),
            _ => 0,
        };
        Self {
            task,
            state: ProcessState::Ready,
            entry: programs::entry_for(task),
            context: Context::boot(task.slot(), programs::entry_label(task), arg),
            interrupt_count: 0,
            context_switch_count: 0,
            cycle_count: 0,
        }
    }

    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.state != ProcessState::Terminated
    }

    /// Charge `cycles` retired in one slice and count the timer interrupts
    /// a preemptive kernel with a `slice`-cycle quantum would have taken.
    ///
    /// # Returns
    /// Number of interrupts newly counted.
    pub fn charge_cycles(&mut self, cycles: u64, slice: u64) -> u32 {
        let before = self.cycle_count / slice;
        self.cycle_count += cycles;
        let fired = (self.cycle_count / slice - before) as u32;
        self.interrupt_count += fired;
        fired
    }
}
