//! # Kernel
//!
//! Top-level entry point. The kernel owns everything one run needs: the
//! shared state region, the scheduler with its PCB store, and the
//! instrumentation collector. Nothing is global; each run boots a fresh
//! kernel.
//!
//! ## Startup Sequence
//!
//! ```text
//! start(input, scenario)
//!   ├─► Scenario::resolve()       ← reject or fall back per policy
//!   ├─► Kernel::boot()
//!   │     ├─► SharedState::load() ← zero registers, bind input
//!   │     └─► Scheduler::new()    ← three PCBs with boot contexts
//!   └─► Kernel::schedule()
//!         ├─► Scheduler::run()    ← until cursor == N
//!         └─► RunResult           ← final state, counters, snapshots
//! ```

use core::cell::RefCell;
use std::time::Duration;

use log::info;

use crate::config::{RunConfig, NUM_TASKS};
use crate::error::KernelError;
use crate::instrument::{Collector, RunStats, Snapshot};
use crate::memory_map::{SharedState, StateView};
use crate::scheduler::{Scenario, Scheduler};
use crate::sync::Mutex;
use crate::task::{ProcessControlBlock, ProcessState, TaskId};

// ---------------------------------------------------------------------------
// Run result
// ---------------------------------------------------------------------------

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every sample was consumed.
    Drained,
    /// There was nothing to schedule; no task was dispatched.
    EmptyInput,
}

/// Final state and counters of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskId,
    pub state: ProcessState,
    pub interrupt_count: u32,
    pub context_switch_count: u32,
    pub cycle_count: u64,
}

impl From<&ProcessControlBlock> for TaskReport {
    fn from(pcb: &ProcessControlBlock) -> Self {
        Self {
            task: pcb.task,
            state: pcb.state,
            interrupt_count: pcb.interrupt_count,
            context_switch_count: pcb.context_switch_count,
            cycle_count: pcb.cycle_count,
        }
    }
}

/// Outcome of [`start`].
#[derive(Debug, Clone)]
pub struct RunResult {
    pub scenario: Scenario,
    pub completion: Completion,
    /// Number of samples in the input.
    pub samples: usize,
    /// Final shared state, including the final cursor.
    pub state: StateView,
    /// Per-task reports in PCB-slot order.
    pub tasks: [TaskReport; NUM_TASKS],
    pub stats: RunStats,
    pub snapshots: Vec<Snapshot>,
    /// Snapshots lost to a full buffer.
    pub snapshots_dropped: usize,
    pub elapsed: Duration,
}

impl RunResult {
    #[inline]
    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    #[inline]
    pub fn task(&self, task: TaskId) -> &TaskReport {
        &self.tasks[task.slot()]
    }
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

/// A booted kernel, ready for exactly one run.
pub struct Kernel {
    memory: SharedState,
    scheduler: Scheduler,
    collector: Mutex<RefCell<Collector>>,
    config: RunConfig,
}

impl Kernel {
    /// Load `input` and create the PCB store.
    ///
    /// # Errors
    /// [`KernelError::InputTooLong`] if `input` exceeds the sample buffer.
    pub fn boot(input: &[i32], config: RunConfig) -> Result<Self, KernelError> {
        let memory = SharedState::load(input)?;
        Ok(Self {
            memory,
            scheduler: Scheduler::new(config.cooler_mode),
            collector: Mutex::new(RefCell::new(Collector::new(&config))),
            config,
        })
    }

    pub fn memory(&self) -> &SharedState {
        &self.memory
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Resolve `scenario` under the configured policy and run it.
    ///
    /// # Errors
    /// [`KernelError::InvalidScenario`] under `ScenarioPolicy::Reject`.
    pub fn schedule(self, scenario: i64) -> Result<RunResult, KernelError> {
        let scenario = Scenario::resolve(scenario, self.config.scenario_policy)?;
        Ok(self.run(scenario))
    }

    /// Run an already-resolved scenario to completion.
    pub fn run(mut self, scenario: Scenario) -> RunResult {
        info!(
            "scenario {} ({}) over {} samples, cooler {:?}",
            scenario.id(),
            scenario,
            self.memory.len(),
            self.config.cooler_mode
        );

        let completion = if self.memory.is_empty() {
            Completion::EmptyInput
        } else {
            self.scheduler
                .run(scenario, &self.memory, &self.collector, &self.config);
            Completion::Drained
        };

        let collector = self.collector.into_inner().into_inner();
        let result = RunResult {
            scenario,
            completion,
            samples: self.memory.len(),
            state: self.memory.view(),
            tasks: self.scheduler.pcbs.each_ref().map(TaskReport::from),
            stats: collector.stats(),
            snapshots: collector.snapshots().to_vec(),
            snapshots_dropped: collector.dropped(),
            elapsed: collector.elapsed(),
        };
        info!(
            "scenario {} done: cursor {}/{}, {} dispatches, uart_last {}",
            scenario.id(),
            result.cursor(),
            result.samples,
            result.stats.dispatches,
            result.state.uart_last
        );
        result
    }
}

/// Run `scenario` over `input` with the default configuration.
///
/// # Errors
/// See [`start_with`].
pub fn start(input: &[i32], scenario: i64) -> Result<RunResult, KernelError> {
    start_with(input, scenario, &RunConfig::default())
}

/// Run `scenario` over `input`.
///
/// # Errors
/// - [`KernelError::InvalidScenario`] for an identifier outside `1..=4`
///   under `ScenarioPolicy::Reject`.
/// - [`KernelError::InputTooLong`] for more samples than the buffer holds.
pub fn start_with(
    input: &[i32],
    scenario: i64,
    config: &RunConfig,
) -> Result<RunResult, KernelError> {
    let scenario = Scenario::resolve(scenario, config.scenario_policy)?;
    Ok(Kernel::boot(input, config.clone())?.run(scenario))
}
