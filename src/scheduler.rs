//! # Scheduler
//!
//! Dispatches the three control tasks according to a [`Scenario`].
//!
//! ## Dispatch Table
//!
//! | Scenario | Order                   | Model       |
//! |----------|-------------------------|-------------|
//! | 1        | Reader → Cooler → Telem | cooperative |
//! | 2        | Reader → Telem → Cooler | cooperative |
//! | 3        | Cooler → Reader → Telem | cooperative |
//! | 4        | none enforced           | concurrent  |
//!
//! The cooperative scenarios are rows of [`DISPATCH_TABLE`] consumed by a
//! single loop; adding a scenario never touches a task body.
//!
//! ## Cooperative Model (1–3)
//!
//! One task runs at a time on the scheduler's [`Cpu`]. Each dispatch step:
//! 1. **Save** the running task's context into its PCB
//! 2. **Pick** the next runnable task from the scenario row
//! 3. **Restore** its context onto the CPU
//! 4. **Run** it until its next yield or exit
//!
//! The cursor is checked at every round boundary; once it reaches `N` no
//! further dispatch is issued. Tasks still Ready at that point stay Ready.
//! Only the Reader advances the cursor and it runs at most once per step,
//! so each step moves the cursor by at most one.
//!
//! ## Concurrent Model (4)
//!
//! Each PCB is lent to its own scoped host thread. Threads poll the shared
//! state without mutual exclusion, sleeping between slices, and the run
//! ends when all three tasks have observed `cursor == N` and exited.

use core::cell::RefCell;
use core::fmt;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::arch::rv32::{Cpu, Slice};
use crate::config::{RunConfig, ScenarioPolicy, NUM_TASKS};
use crate::error::KernelError;
use crate::instrument::Collector;
use crate::memory_map::SharedState;
use crate::sync::{self, Mutex};
use crate::task::{CoolerMode, ProcessControlBlock, ProcessState, TaskId};

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Relative dispatch order of the three tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// P1 → P2 → P3.
    Baseline = 1,
    /// P1 → P3 → P2.
    TelemetryFirst = 2,
    /// P2 → P1 → P3.
    CoolerFirst = 3,
    /// All three at once, no enforced order.
    Concurrent = 4,
}

/// Dispatch order of each cooperative scenario, indexed by `id - 1`.
pub static DISPATCH_TABLE: [[TaskId; NUM_TASKS]; 3] = [
    [TaskId::Reader, TaskId::Cooler, TaskId::Telemetry],
    [TaskId::Reader, TaskId::Telemetry, TaskId::Cooler],
    [TaskId::Cooler, TaskId::Reader, TaskId::Telemetry],
];

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Baseline,
        Scenario::TelemetryFirst,
        Scenario::CoolerFirst,
        Scenario::Concurrent,
    ];

    #[inline]
    pub const fn id(self) -> i64 {
        self as i64
    }

    /// Dispatch order, or `None` for the concurrent scenario.
    pub fn order(self) -> Option<&'static [TaskId; NUM_TASKS]> {
        match self {
            Scenario::Concurrent => None,
            _ => DISPATCH_TABLE.get(self as usize - 1),
        }
    }

    /// Map a raw identifier to a scenario under `policy`.
    ///
    /// # Errors
    /// [`KernelError::InvalidScenario`] for identifiers outside `1..=4`
    /// under [`ScenarioPolicy::Reject`].
    pub fn resolve(id: i64, policy: ScenarioPolicy) -> Result<Scenario, KernelError> {
        match (Scenario::try_from(id), policy) {
            (Ok(scenario), _) => Ok(scenario),
            (Err(_), ScenarioPolicy::FallbackToBaseline) => {
                warn!("invalid scenario {id}, falling back to scenario 1");
                Ok(Scenario::Baseline)
            }
            (Err(err), ScenarioPolicy::Reject) => Err(err),
        }
    }
}

impl TryFrom<i64> for Scenario {
    type Error = KernelError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Scenario::ALL
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or(KernelError::InvalidScenario(id))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order() {
            Some(order) => {
                let mut sep = "";
                for task in order {
                    write!(f, "{sep}P{}", task.pid())?;
                    sep = " → ";
                }
                Ok(())
            }
            None => f.write_str("P1 ∥ P2 ∥ P3"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the PCB store and the CPU the cooperative model runs on.
pub struct Scheduler {
    /// PCBs in slot order (see [`TaskId::slot`]).
    pub pcbs: [ProcessControlBlock; NUM_TASKS],
    /// Task whose context is live on `cpu`.
    pub current: Option<TaskId>,
    cpu: Cpu,
}

impl Scheduler {
    /// Create the three PCBs with their boot contexts.
    pub fn new(cooler_mode: CoolerMode) -> Self {
        Self {
            pcbs: TaskId::ALL.map(|task| ProcessControlBlock::new(task, cooler_mode)),
            current: None,
            cpu: Cpu::new(),
        }
    }

    #[inline]
    pub fn pcb(&self, task: TaskId) -> &ProcessControlBlock {
        &self.pcbs[task.slot()]
    }

    /// Run `scenario` over `mem` until the input is exhausted.
    pub fn run(
        &mut self,
        scenario: Scenario,
        mem: &SharedState,
        collector: &Mutex<RefCell<Collector>>,
        config: &RunConfig,
    ) {
        match scenario.order() {
            Some(order) => self.run_cooperative(order, mem, collector),
            None => self.run_concurrent(mem, collector, config),
        }
    }

    fn run_cooperative(
        &mut self,
        order: &[TaskId; NUM_TASKS],
        mem: &SharedState,
        collector: &Mutex<RefCell<Collector>>,
    ) {
        while !mem.is_exhausted() {
            for &task in order {
                if self.pcbs[task.slot()].is_runnable() {
                    self.dispatch(task, mem, collector);
                }
            }
        }
        self.park();
    }

    /// Run `task` for one slice, switching contexts first if needed.
    pub fn dispatch(
        &mut self,
        task: TaskId,
        mem: &SharedState,
        collector: &Mutex<RefCell<Collector>>,
    ) -> Slice {
        if self.current != Some(task) {
            self.context_switch(task, collector);
        }

        let pcb = &mut self.pcbs[task.slot()];
        pcb.state = ProcessState::Running;
        let cursor_before = mem.cursor();
        let cycles_before = self.cpu.cycles();
        let outcome = (pcb.entry)(&mut self.cpu, mem);
        let cycles = self.cpu.cycles() - cycles_before;

        sync::with_locked(collector, |c| {
            c.on_slice_end(pcb, cycles, outcome, cursor_before, mem)
        });

        match outcome {
            Slice::Yield => pcb.state = ProcessState::Ready,
            Slice::Exit => {
                pcb.context = self.cpu.save();
                pcb.state = ProcessState::Terminated;
                self.current = None;
                debug!("{} exited at cursor {}", task.name(), mem.cursor());
            }
        }
        outcome
    }

    /// Save the live context into the running PCB and restore `next`.
    fn context_switch(&mut self, next: TaskId, collector: &Mutex<RefCell<Collector>>) {
        if let Some(prev) = self.current {
            self.pcbs[prev.slot()].context = self.cpu.save();
            debug!("switch {} -> {}", prev.name(), next.name());
        }
        let pcb = &mut self.pcbs[next.slot()];
        self.cpu.restore(&pcb.context);
        self.current = Some(next);
        sync::with_locked(collector, |c| c.on_switch_in(pcb));
    }

    /// Write the live context back so every PCB reflects its last slice.
    fn park(&mut self) {
        if let Some(task) = self.current.take() {
            self.pcbs[task.slot()].context = self.cpu.save();
        }
    }

    fn run_concurrent(
        &mut self,
        mem: &SharedState,
        collector: &Mutex<RefCell<Collector>>,
        config: &RunConfig,
    ) {
        self.park();
        info!(
            "launching {} host threads",
            self.pcbs.iter().filter(|p| p.is_runnable()).count()
        );
        thread::scope(|s| {
            for pcb in self.pcbs.iter_mut().filter(|p| p.is_runnable()) {
                let period = match pcb.task {
                    TaskId::Reader => config.reader_period,
                    _ => config.poll_period,
                };
                s.spawn(move || host_task(pcb, mem, collector, period));
            }
        });
    }
}

/// Body of one host thread in the concurrent model. The thread holds the
/// task's context on its own CPU and writes it back on exit.
fn host_task(
    pcb: &mut ProcessControlBlock,
    mem: &SharedState,
    collector: &Mutex<RefCell<Collector>>,
    period: Duration,
) {
    let mut cpu = Cpu::new();
    cpu.restore(&pcb.context);

    loop {
        sync::with_locked(collector, |c| c.on_switch_in(pcb));
        pcb.state = ProcessState::Running;
        let cursor_before = mem.cursor();
        let cycles_before = cpu.cycles();
        let outcome = (pcb.entry)(&mut cpu, mem);
        let cycles = cpu.cycles() - cycles_before;
        sync::with_locked(collector, |c| {
            c.on_slice_end(pcb, cycles, outcome, cursor_before, mem)
        });

        if outcome == Slice::Exit {
            break;
        }
        pcb.state = ProcessState::Ready;
        if period.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(period);
        }
    }

    pcb.context = cpu.save();
    pcb.state = ProcessState::Terminated;
    debug!("{} exited at cursor {}", pcb.task.name(), mem.cursor());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{COOLER_LOOP, READER_LOOP};

    fn collector() -> Mutex<RefCell<Collector>> {
        Mutex::new(RefCell::new(Collector::new(&RunConfig::default())))
    }

    #[test]
    fn test_scenario_ids() {
        for (i, scenario) in Scenario::ALL.iter().enumerate() {
            assert_eq!(Scenario::try_from(i as i64 + 1), Ok(*scenario));
        }
        assert_eq!(Scenario::try_from(0), Err(KernelError::InvalidScenario(0)));
        assert_eq!(Scenario::try_from(5), Err(KernelError::InvalidScenario(5)));
    }

    #[test]
    fn test_resolve_policy() {
        assert_eq!(
            Scenario::resolve(9, ScenarioPolicy::Reject),
            Err(KernelError::InvalidScenario(9))
        );
        assert_eq!(
            Scenario::resolve(-1, ScenarioPolicy::FallbackToBaseline),
            Ok(Scenario::Baseline)
        );
        assert_eq!(
            Scenario::resolve(3, ScenarioPolicy::FallbackToBaseline),
            Ok(Scenario::CoolerFirst)
        );
    }

    #[test]
    fn test_display_matches_dispatch_order() {
        assert_eq!(Scenario::Baseline.to_string(), "P1 → P2 → P3");
        assert_eq!(Scenario::TelemetryFirst.to_string(), "P1 → P3 → P2");
        assert_eq!(Scenario::CoolerFirst.to_string(), "P2 → P1 → P3");
        assert!(Scenario::Concurrent.order().is_none());
    }

    #[test]
    fn test_each_dispatch_advances_cursor_at_most_once() {
        let mem = SharedState::load(&[60, 70, 80, 90]).unwrap();
        let c = collector();
        let mut sched = Scheduler::new(CoolerMode::Mirror);
        let order = Scenario::CoolerFirst.order().unwrap();
        while !mem.is_exhausted() {
            for &task in order {
                let before = mem.cursor();
                sched.dispatch(task, &mem, &c);
                let after = mem.cursor();
                assert!(after - before <= 1);
                if task != TaskId::Reader {
                    assert_eq!(after, before);
                }
            }
        }
    }

    #[test]
    fn test_context_is_saved_on_switch_out() {
        let mem = SharedState::load(&[60, 70]).unwrap();
        let c = collector();
        let mut sched = Scheduler::new(CoolerMode::Mirror);

        sched.dispatch(TaskId::Reader, &mem, &c);
        assert_eq!(sched.current, Some(TaskId::Reader));
        sched.dispatch(TaskId::Cooler, &mem, &c);

        let reader = sched.pcb(TaskId::Reader);
        assert_eq!(reader.context.program_counter, READER_LOOP);
        assert_eq!(reader.context.registers[crate::arch::rv32::A0], 60);
        assert_eq!(reader.state, ProcessState::Ready);
        assert_eq!(reader.context_switch_count, 1);
        assert_eq!(sched.current, Some(TaskId::Cooler));
    }

    #[test]
    fn test_redispatching_current_task_is_not_a_switch() {
        let mem = SharedState::load(&[60, 70, 80]).unwrap();
        let c = collector();
        let mut sched = Scheduler::new(CoolerMode::Mirror);
        sched.dispatch(TaskId::Reader, &mem, &c);
        sched.dispatch(TaskId::Reader, &mem, &c);
        assert_eq!(sched.pcb(TaskId::Reader).context_switch_count, 1);
        assert_eq!(mem.cursor(), 2);
    }

    #[test]
    fn test_cooperative_run_leaves_lagging_tasks_ready() {
        let mem = SharedState::load(&[50, 95]).unwrap();
        let c = collector();
        let mut sched = Scheduler::new(CoolerMode::Mirror);
        sched.run(Scenario::CoolerFirst, &mem, &c, &RunConfig::default());

        assert!(mem.is_exhausted());
        assert_eq!(sched.current, None);
        assert_eq!(sched.pcb(TaskId::Telemetry).state, ProcessState::Terminated);
        assert_eq!(sched.pcb(TaskId::Cooler).state, ProcessState::Ready);
        assert_eq!(sched.pcb(TaskId::Cooler).context.program_counter, COOLER_LOOP);
        // The cooler ran before the last sample and never saw the new flag.
        assert!(mem.cooling_flag());
        assert!(!mem.cooling_state());
    }

    #[test]
    fn test_concurrent_run_terminates_every_task() {
        let mem = SharedState::load(&[50, 95, 60, 40, 100]).unwrap();
        let c = collector();
        let mut sched = Scheduler::new(CoolerMode::ActiveWait);
        sched.run(Scenario::Concurrent, &mem, &c, &RunConfig::unthrottled());

        assert_eq!(mem.cursor(), 5);
        for pcb in &sched.pcbs {
            assert_eq!(pcb.state, ProcessState::Terminated);
            assert!(pcb.context_switch_count >= 1);
        }
    }
}
