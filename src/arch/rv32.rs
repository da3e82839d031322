//! # RV32 Context Model
//!
//! A task's execution context is a program counter, a stack pointer and
//! the 32-word general-purpose register file. Task bodies are resumable
//! state machines: the program counter holds the label a task resumes at,
//! and the registers hold the locals that must survive a yield.
//!
//! ## Context Switch Mechanism
//!
//! ```text
//!   PCB[prev].context ◄── save ──┐
//!                                 Cpu { context, cycles }
//!   PCB[next].context ── restore ─┘        │
//!                                          ▼
//!                               entry(&mut Cpu, &SharedState)
//!                                 runs to next yield / exit
//! ```
//!
//! The scheduler is the only component that copies contexts in and out of
//! PCBs. A task body mutates the live context only.

use crate::config::{NUM_REGISTERS, STACK_BASE, STACK_SIZE};

// ---------------------------------------------------------------------------
// ABI register names
// ---------------------------------------------------------------------------

/// Hard-wired zero.
pub const ZERO: usize = 0;
/// Stack pointer.
pub const SP: usize = 2;
pub const T0: usize = 5;
pub const T1: usize = 6;
pub const A0: usize = 10;
/// Syscall number register (`ecall` convention).
pub const A7: usize = 17;

/// `sys_yield` syscall number, placed in `a7` at every yield.
pub const SYS_YIELD: u32 = 124;

/// `sys_exit` syscall number, placed in `a7` when a task returns.
pub const SYS_EXIT: u32 = 93;

// ---------------------------------------------------------------------------
// Saved context
// ---------------------------------------------------------------------------

/// Saved execution context of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Resumption label of the task's state machine.
    pub program_counter: u32,
    /// Top of the task's private stack.
    pub stack_pointer: u32,
    /// General-purpose registers x0–x31.
    pub registers: [u32; NUM_REGISTERS],
}

impl Context {
    /// A zeroed context.
    pub const fn empty() -> Self {
        Self {
            program_counter: 0,
            stack_pointer: 0,
            registers: [0; NUM_REGISTERS],
        }
    }

    /// Initial context for the task in stack slot `slot`, starting at
    /// `entry_label` with `arg` in `a0`.
    ///
    /// ## Stack Layout
    ///
    /// ```text
    /// STACK_BASE + 3*STACK_SIZE ┐ slot 2 (Telemetry)
    /// STACK_BASE + 2*STACK_SIZE ┤ slot 1 (Cooler)
    /// STACK_BASE + 1*STACK_SIZE ┤ slot 0 (Reader)
    /// STACK_BASE                ┘
    /// ```
    ///
    /// The stack pointer starts at the top of the slot, aligned to 16
    /// bytes as the RISC-V psABI requires.
    pub fn boot(slot: usize, entry_label: u32, arg: u32) -> Self {
        let top = (STACK_BASE + (slot as u32 + 1) * STACK_SIZE) & !0x0F;
        let mut ctx = Self::empty();
        ctx.program_counter = entry_label;
        ctx.stack_pointer = top;
        ctx.registers[SP] = top;
        ctx.registers[A0] = arg;
        ctx
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Live CPU
// ---------------------------------------------------------------------------

/// How a slice of task execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    /// The task yielded and can be resumed at its saved program counter.
    Yield,
    /// The task returned; it must not be dispatched again.
    Exit,
}

/// The processor as seen by the running task.
///
/// `cycles` is the `rdcycle` analogue: every retired operation adds one.
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    context: Context,
    cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a saved context. Called by the scheduler only.
    #[inline]
    pub fn restore(&mut self, context: &Context) {
        self.context = *context;
    }

    /// Copy out the live context. Called by the scheduler only.
    #[inline]
    pub fn save(&self) -> Context {
        self.context
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.context.program_counter
    }

    /// Read register `r`. `x0` always reads as zero.
    #[inline]
    pub fn reg(&self, r: usize) -> u32 {
        if r == ZERO {
            0
        } else {
            self.context.registers[r]
        }
    }

    /// Write register `r`, retiring one operation. Writes to `x0` are
    /// discarded.
    #[inline]
    pub fn set(&mut self, r: usize, value: u32) {
        if r != ZERO {
            self.context.registers[r] = value;
        }
        self.cycles += 1;
    }

    /// Retire `n` operations that touch no register (stores, branches).
    #[inline]
    pub fn retire(&mut self, n: u64) {
        self.cycles += n;
    }

    /// Cycles retired since this CPU was created.
    #[inline]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// End the slice with `ecall sys_yield`, resuming later at `label`.
    pub fn yield_at(&mut self, label: u32) -> Slice {
        self.set(A7, SYS_YIELD);
        self.context.program_counter = label;
        Slice::Yield
    }

    /// End the task with `ecall sys_exit`.
    pub fn exit(&mut self) -> Slice {
        self.set(A7, SYS_EXIT);
        Slice::Exit
    }
}
