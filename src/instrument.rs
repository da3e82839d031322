//! # Instrumentation Collector
//!
//! Passive observer invoked by the scheduler at every dispatch boundary.
//! It maintains per-task counters in the PCBs, run-wide totals, and a
//! bounded list of [`Snapshot`]s of the shared state. Nothing here feeds
//! back into a scheduling decision.
//!
//! ## Counters
//!
//! | Counter              | Incremented when                                   |
//! |----------------------|----------------------------------------------------|
//! | `context_switches`   | a task is switched in                              |
//! | `syscalls`           | a task ends its slice with `ecall` (yield or exit) |
//! | `cycles`             | a slice retires operations                         |
//! | `interrupts`         | a task's cycles cross a time-slice boundary        |
//!
//! ## Snapshot Overflow
//!
//! The buffer holds [`SNAPSHOT_CAPACITY`] entries. Once full, further
//! snapshots are dropped and counted; recorded entries are never replaced.

use std::time::{Duration, Instant};

use heapless::Vec;
use log::warn;

use crate::arch::rv32::Slice;
use crate::config::{RunConfig, SNAPSHOT_CAPACITY};
use crate::error::KernelError;
use crate::memory_map::SharedState;
use crate::task::ProcessControlBlock;

/// Point-in-time record of the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Wall time since the run started.
    pub elapsed: Duration,
    /// Dispatch step that triggered the snapshot (1-based).
    pub step: u64,
    pub temperature: i32,
    pub cooling_flag: bool,
    pub cooling_state: bool,
    pub uart_last: i32,
    pub cursor: usize,
}

impl Snapshot {
    pub fn capture(mem: &SharedState, step: u64, elapsed: Duration) -> Self {
        let view = mem.view();
        Self {
            elapsed,
            step,
            temperature: view.temperature,
            cooling_flag: view.cooling_flag,
            cooling_state: view.cooling_state,
            uart_last: view.uart_last,
            cursor: view.cursor,
        }
    }
}

/// Run-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub dispatches: u64,
    pub context_switches: u64,
    pub interrupts: u64,
    pub syscalls: u64,
    pub cycles: u64,
}

impl RunStats {
    /// Syscalls per second of wall time.
    pub fn syscall_rate(&self, elapsed: Duration) -> f64 {
        per_second(self.syscalls, elapsed)
    }

    /// Timer-interrupt proxies per second of wall time.
    pub fn interrupt_rate(&self, elapsed: Duration) -> f64 {
        per_second(self.interrupts, elapsed)
    }
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// The collector for one run.
#[derive(Debug)]
pub struct Collector {
    stats: RunStats,
    snapshots: Vec<Snapshot, SNAPSHOT_CAPACITY>,
    dropped: usize,
    interval: usize,
    time_slice: u64,
    started: Instant,
}

impl Collector {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            stats: RunStats::default(),
            snapshots: Vec::new(),
            dropped: 0,
            interval: config.effective_snapshot_interval(),
            time_slice: config.effective_time_slice(),
            started: Instant::now(),
        }
    }

    /// `pcb` is about to run.
    pub fn on_switch_in(&mut self, pcb: &mut ProcessControlBlock) {
        pcb.context_switch_count += 1;
        self.stats.context_switches += 1;
    }

    /// `pcb` finished a slice that retired `cycles` and moved the cursor
    /// from `cursor_before`.
    pub fn on_slice_end(
        &mut self,
        pcb: &mut ProcessControlBlock,
        cycles: u64,
        outcome: Slice,
        cursor_before: usize,
        mem: &SharedState,
    ) {
        self.stats.dispatches += 1;
        self.stats.syscalls += 1;
        self.stats.cycles += cycles;
        self.stats.interrupts += u64::from(pcb.charge_cycles(cycles, self.time_slice));
        log::trace!(
            "step {}: {} {:?} after {} cycles",
            self.stats.dispatches,
            pcb.task.name(),
            outcome,
            cycles
        );

        let cursor = mem.cursor();
        if cursor != cursor_before && (cursor % self.interval == 0 || cursor == mem.len()) {
            let snapshot = Snapshot::capture(mem, self.stats.dispatches, self.started.elapsed());
            // Overflow only stops recording.
            let _ = self.record(snapshot);
        }
    }

    /// Append a snapshot.
    ///
    /// # Errors
    /// [`KernelError::SnapshotOverflow`] once the buffer is full. The
    /// snapshot is dropped and already-recorded entries are untouched.
    pub fn record(&mut self, snapshot: Snapshot) -> Result<(), KernelError> {
        if self.snapshots.push(snapshot).is_err() {
            if self.dropped == 0 {
                warn!(
                    "snapshot buffer full ({} entries), recording stopped",
                    SNAPSHOT_CAPACITY
                );
            }
            self.dropped += 1;
            return Err(KernelError::SnapshotOverflow {
                capacity: SNAPSHOT_CAPACITY,
            });
        }
        Ok(())
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Snapshots that did not fit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{CoolerMode, TaskId};

    fn snapshot(step: u64) -> Snapshot {
        Snapshot {
            elapsed: Duration::ZERO,
            step,
            temperature: 0,
            cooling_flag: false,
            cooling_state: false,
            uart_last: 0,
            cursor: 0,
        }
    }

    #[test]
    fn test_overflow_stops_recording_without_wrapping() {
        let mut collector = Collector::new(&RunConfig::default());
        for step in 0..SNAPSHOT_CAPACITY as u64 {
            assert!(collector.record(snapshot(step)).is_ok());
        }
        assert_eq!(
            collector.record(snapshot(999)),
            Err(KernelError::SnapshotOverflow {
                capacity: SNAPSHOT_CAPACITY
            })
        );
        let _ = collector.record(snapshot(1000));

        assert_eq!(collector.snapshots().len(), SNAPSHOT_CAPACITY);
        assert_eq!(collector.dropped(), 2);
        assert_eq!(collector.snapshots()[0].step, 0);
        assert_eq!(
            collector.snapshots()[SNAPSHOT_CAPACITY - 1].step,
            SNAPSHOT_CAPACITY as u64 - 1
        );
    }

    #[test]
    fn test_slice_end_updates_pcb_and_totals() {
        let config = RunConfig {
            time_slice_cycles: 4,
            snapshot_interval: 1,
            ..RunConfig::default()
        };
        let mut collector = Collector::new(&config);
        let mut pcb = ProcessControlBlock::new(TaskId::Reader, CoolerMode::Mirror);
        let mem = SharedState::load(&[70, 71]).unwrap();

        collector.on_switch_in(&mut pcb);
        mem.advance_cursor(0);
        collector.on_slice_end(&mut pcb, 9, Slice::Yield, 0, &mem);

        assert_eq!(pcb.context_switch_count, 1);
        assert_eq!(pcb.cycle_count, 9);
        assert_eq!(pcb.interrupt_count, 2);

        let stats = collector.stats();
        assert_eq!(stats.dispatches, 1);
        assert_eq!(stats.context_switches, 1);
        assert_eq!(stats.syscalls, 1);
        assert_eq!(stats.interrupts, 2);
        assert_eq!(stats.cycles, 9);
        assert_eq!(collector.snapshots().len(), 1);
        assert_eq!(collector.snapshots()[0].cursor, 1);
    }

    #[test]
    fn test_snapshot_cadence_includes_final_sample() {
        let config = RunConfig {
            snapshot_interval: 5,
            ..RunConfig::default()
        };
        let mut collector = Collector::new(&config);
        let mut pcb = ProcessControlBlock::new(TaskId::Reader, CoolerMode::Mirror);
        let mem = SharedState::load(&[60; 7]).unwrap();
        for i in 0..7 {
            mem.advance_cursor(i);
            collector.on_slice_end(&mut pcb, 1, Slice::Yield, i, &mem);
        }
        let cursors: std::vec::Vec<usize> =
            collector.snapshots().iter().map(|s| s.cursor).collect();
        assert_eq!(cursors, [5, 7]);
    }

    #[test]
    fn test_no_snapshot_without_progress() {
        let mut collector = Collector::new(&RunConfig::default());
        let mut pcb = ProcessControlBlock::new(TaskId::Telemetry, CoolerMode::Mirror);
        let mem = SharedState::load(&[60; 5]).unwrap();
        collector.on_slice_end(&mut pcb, 3, Slice::Yield, 0, &mem);
        assert!(collector.snapshots().is_empty());
    }

    #[test]
    fn test_rates_handle_zero_elapsed() {
        let stats = RunStats {
            syscalls: 10,
            interrupts: 4,
            ..RunStats::default()
        };
        assert_eq!(stats.syscall_rate(Duration::ZERO), 0.0);
        assert_eq!(stats.syscall_rate(Duration::from_secs(2)), 5.0);
        assert_eq!(stats.interrupt_rate(Duration::from_secs(2)), 2.0);
    }
}
