//! # Task Bodies
//!
//! The three control programs, written as resumable state machines. Each
//! call runs one slice: from the label in the program counter up to the
//! next yield point (or to exit). Locals that survive a yield live in the
//! register file, so a PCB's saved context is all a task needs to resume.
//!
//! ## Program Labels
//!
//! | Label             | Task      | Meaning                                |
//! |-------------------|-----------|----------------------------------------|
//! | `READER_LOOP`     | Reader    | top of the sample loop                 |
//! | `COOLER_LOOP`     | Cooler    | top of the monitor loop                |
//! | `COOLER_MONITOR`  | Cooler    | active-wait poll for the safe band     |
//! | `TELEMETRY_LOOP`  | Telemetry | top of the relay loop                  |
//!
//! ## Loop Shape
//!
//! The Reader tests the cursor before consuming a sample. The Cooler and
//! Telemetry run their body first and test the cursor afterwards, so the
//! value staged by the Reader's last iteration is still observed once
//! before they exit. Every slice re-reads the cursor; nothing cached in a
//! register is trusted across a yield.

use crate::arch::rv32::{Cpu, Slice, A0, T0, T1};
use crate::config::{COOLING_OFF_BELOW, COOLING_ON_ABOVE};
use crate::memory_map::SharedState;
use crate::task::{CoolerMode, TaskEntry, TaskId};

pub const READER_LOOP: u32 = 0x0000_0100;
pub const COOLER_LOOP: u32 = 0x0000_0200;
pub const COOLER_MONITOR: u32 = 0x0000_0240;
pub const TELEMETRY_LOOP: u32 = 0x0000_0300;

const ACTIVE_WAIT: u32 = CoolerMode::ActiveWait.as_arg();

/// Entry point bound to `task`'s PCB.
pub fn entry_for(task: TaskId) -> TaskEntry {
    match task {
        TaskId::Reader => reader,
        TaskId::Cooler => cooler,
        TaskId::Telemetry => telemetry,
    }
}

/// Label a freshly booted `task` starts at.
pub const fn entry_label(task: TaskId) -> u32 {
    match task {
        TaskId::Reader => READER_LOOP,
        TaskId::Cooler => COOLER_LOOP,
        TaskId::Telemetry => TELEMETRY_LOOP,
    }
}

/// Hysteresis rule for the cooling demand.
///
/// On strictly above [`COOLING_ON_ABOVE`], off strictly below
/// [`COOLING_OFF_BELOW`], otherwise `current` is kept. The band
/// `[55, 90]` is inclusive on both ends.
#[inline]
pub const fn cooling_demand(current: bool, temperature: i32) -> bool {
    if temperature > COOLING_ON_ABOVE {
        true
    } else if temperature < COOLING_OFF_BELOW {
        false
    } else {
        current
    }
}

// ---------------------------------------------------------------------------
// P1: Reader
// ---------------------------------------------------------------------------

/// Read one sample, update temperature and cooling demand, stage it for
/// the UART, advance the cursor, yield.
pub fn reader(cpu: &mut Cpu, mem: &SharedState) -> Slice {
    let idx = mem.cursor();
    cpu.set(T0, idx as u32);
    let Some(value) = mem.sample(idx) else {
        return cpu.exit();
    };
    cpu.set(A0, value as u32);
    mem.set_temperature(value);

    let current = mem.cooling_flag();
    let demand = cooling_demand(current, value);
    cpu.set(T1, demand as u32);
    if demand != current {
        mem.set_cooling_flag(demand);
        cpu.retire(1);
    }

    mem.set_uart_buffer(value);
    mem.advance_cursor(idx);
    cpu.retire(3);
    cpu.yield_at(READER_LOOP)
}

// ---------------------------------------------------------------------------
// P2: Cooler
// ---------------------------------------------------------------------------

/// Drive `cooling_state` from `cooling_flag`. The variant is the boot
/// argument left in `a0`.
pub fn cooler(cpu: &mut Cpu, mem: &SharedState) -> Slice {
    if cpu.pc() == COOLER_MONITOR {
        return cooler_monitor(cpu, mem);
    }
    if cpu.reg(A0) == ACTIVE_WAIT {
        cooler_engage(cpu, mem)
    } else {
        cooler_mirror(cpu, mem)
    }
}

fn cooler_mirror(cpu: &mut Cpu, mem: &SharedState) -> Slice {
    let flag = mem.cooling_flag();
    cpu.set(T0, flag as u32);
    mem.set_cooling_state(flag);
    cpu.retire(1);
    loop_or_exit(cpu, mem, COOLER_LOOP)
}

fn cooler_engage(cpu: &mut Cpu, mem: &SharedState) -> Slice {
    let flag = mem.cooling_flag();
    cpu.set(T0, flag as u32);
    mem.set_cooling_state(flag);
    cpu.retire(1);
    if flag {
        cooler_monitor(cpu, mem)
    } else {
        loop_or_exit(cpu, mem, COOLER_LOOP)
    }
}

// Hold the actuator on until the temperature leaves [55, ..) or the
// stream ends.
fn cooler_monitor(cpu: &mut Cpu, mem: &SharedState) -> Slice {
    let temperature = mem.temperature();
    cpu.set(T1, temperature as u32);
    if temperature >= COOLING_OFF_BELOW && !mem.is_exhausted() {
        return cpu.yield_at(COOLER_MONITOR);
    }
    mem.set_cooling_state(false);
    cpu.retire(1);
    loop_or_exit(cpu, mem, COOLER_LOOP)
}

// ---------------------------------------------------------------------------
// P3: Telemetry
// ---------------------------------------------------------------------------

/// Transmit the staged UART value, if any, and mark the buffer consumed.
/// A staged value of `0` is indistinguishable from an empty buffer.
pub fn telemetry(cpu: &mut Cpu, mem: &SharedState) -> Slice {
    let staged = mem.uart_buffer();
    cpu.set(T0, staged as u32);
    if staged != 0 {
        mem.set_uart_last(staged);
        mem.set_uart_buffer(0);
        cpu.retire(2);
    }
    loop_or_exit(cpu, mem, TELEMETRY_LOOP)
}

/// Bottom-of-loop test shared by the consumers.
fn loop_or_exit(cpu: &mut Cpu, mem: &SharedState, label: u32) -> Slice {
    let idx = mem.cursor();
    cpu.set(T1, idx as u32);
    if idx >= mem.len() {
        cpu.exit()
    } else {
        cpu.yield_at(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::rv32::Context;

    fn booted(task: TaskId, mode: CoolerMode) -> Cpu {
        let mut cpu = Cpu::new();
        let arg = if task == TaskId::Cooler { mode.as_arg() } else { 0 };
        cpu.restore(&Context::boot(task.slot(), entry_label(task), arg));
        cpu
    }

    #[test]
    fn test_hysteresis_boundaries_are_strict() {
        assert!(!cooling_demand(false, 90));
        assert!(cooling_demand(true, 90));
        assert!(cooling_demand(false, 91));
        assert!(cooling_demand(true, 55));
        assert!(!cooling_demand(false, 55));
        assert!(!cooling_demand(true, 54));
        assert!(cooling_demand(true, 70));
        assert!(!cooling_demand(false, 70));
    }

    #[test]
    fn test_reader_consumes_one_sample_per_slice() {
        let mem = SharedState::load(&[95, 60]).unwrap();
        let mut cpu = booted(TaskId::Reader, CoolerMode::Mirror);

        assert_eq!(reader(&mut cpu, &mem), Slice::Yield);
        assert_eq!(mem.cursor(), 1);
        assert_eq!(mem.temperature(), 95);
        assert!(mem.cooling_flag());
        assert_eq!(mem.uart_buffer(), 95);

        assert_eq!(reader(&mut cpu, &mem), Slice::Yield);
        assert_eq!(mem.cursor(), 2);
        assert!(mem.cooling_flag(), "60 is inside the band");

        assert_eq!(reader(&mut cpu, &mem), Slice::Exit);
        assert_eq!(mem.cursor(), 2);
    }

    #[test]
    fn test_reader_exits_on_empty_input() {
        let mem = SharedState::load(&[]).unwrap();
        let mut cpu = booted(TaskId::Reader, CoolerMode::Mirror);
        assert_eq!(reader(&mut cpu, &mem), Slice::Exit);
        assert_eq!(mem.view().temperature, 0);
    }

    #[test]
    fn test_mirror_cooler_copies_flag() {
        let mem = SharedState::load(&[95, 40]).unwrap();
        let mut cpu = booted(TaskId::Cooler, CoolerMode::Mirror);
        mem.set_cooling_flag(true);
        assert_eq!(cooler(&mut cpu, &mem), Slice::Yield);
        assert!(mem.cooling_state());

        mem.set_cooling_flag(false);
        assert_eq!(cooler(&mut cpu, &mem), Slice::Yield);
        assert!(!mem.cooling_state());
    }

    #[test]
    fn test_consumers_run_body_once_after_exhaustion() {
        let mem = SharedState::load(&[80]).unwrap();
        let mut reader_cpu = booted(TaskId::Reader, CoolerMode::Mirror);
        reader(&mut reader_cpu, &mem);
        assert!(mem.is_exhausted());

        let mut cpu = booted(TaskId::Telemetry, CoolerMode::Mirror);
        assert_eq!(telemetry(&mut cpu, &mem), Slice::Exit);
        assert_eq!(mem.uart_last(), 80);
        assert_eq!(mem.uart_buffer(), 0);
    }

    #[test]
    fn test_active_wait_holds_state_until_safe_band() {
        let mem = SharedState::load(&[95, 70, 50, 60]).unwrap();
        let mut r = booted(TaskId::Reader, CoolerMode::ActiveWait);
        let mut c = booted(TaskId::Cooler, CoolerMode::ActiveWait);

        reader(&mut r, &mem);
        assert_eq!(cooler(&mut c, &mem), Slice::Yield);
        assert!(mem.cooling_state());
        assert_eq!(c.pc(), COOLER_MONITOR);

        reader(&mut r, &mem); // 70: still waiting
        assert_eq!(cooler(&mut c, &mem), Slice::Yield);
        assert!(mem.cooling_state());
        assert_eq!(c.pc(), COOLER_MONITOR);

        reader(&mut r, &mem); // 50: safe band reached
        assert_eq!(cooler(&mut c, &mem), Slice::Yield);
        assert!(!mem.cooling_state());
        assert_eq!(c.pc(), COOLER_LOOP);
    }

    #[test]
    fn test_active_wait_releases_on_exhaustion() {
        let mem = SharedState::load(&[100]).unwrap();
        let mut r = booted(TaskId::Reader, CoolerMode::ActiveWait);
        let mut c = booted(TaskId::Cooler, CoolerMode::ActiveWait);
        reader(&mut r, &mem);
        assert_eq!(cooler(&mut c, &mem), Slice::Exit);
        assert!(mem.cooling_flag());
        assert!(!mem.cooling_state());
    }

    #[test]
    fn test_telemetry_ignores_empty_buffer() {
        let mem = SharedState::load(&[1, 2]).unwrap();
        mem.set_uart_last(33);
        let mut cpu = booted(TaskId::Telemetry, CoolerMode::Mirror);
        assert_eq!(telemetry(&mut cpu, &mem), Slice::Yield);
        assert_eq!(mem.uart_last(), 33);
    }

    #[test]
    fn test_slices_retire_cycles() {
        let mem = SharedState::load(&[60]).unwrap();
        let mut cpu = booted(TaskId::Reader, CoolerMode::Mirror);
        reader(&mut cpu, &mem);
        assert!(cpu.cycles() > 0);
    }
}
