//! # Shared State Region
//!
//! The memory-mapped registers every task and the scheduler observe and
//! mutate directly. Each register is an atomic accessed with
//! `Ordering::Relaxed`: a store by one task becomes visible to another at
//! an arbitrary point of its execution, exactly like an unsynchronized
//! hardware register. No operation here takes a lock.
//!
//! ```text
//!   temperature   cooling_flag   cooling_state   uart_buffer   uart_last
//!   ───────────   ────────────   ─────────────   ───────────   ─────────
//!   Reader: W     Reader: RW     Cooler: W       Reader: W     Telemetry: W
//!   Cooler: R     Cooler: R                      Telemetry: RW
//!
//!   input[0..N]  (immutable)     cursor: Reader advances, everyone reads
//! ```
//!
//! Read-modify-write sequences built from these accessors are not atomic
//! as a whole. The races this admits in the concurrent model (the
//! `cooling_flag`/`cooling_state` lag, a staged UART value being cleared
//! after a newer one was written) are part of the modeled behavior.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use crate::config::MAX_SAMPLES;
use crate::error::KernelError;

/// Process-wide shared state for one run.
#[derive(Debug)]
pub struct SharedState {
    temperature: AtomicI32,
    cooling_flag: AtomicBool,
    cooling_state: AtomicBool,
    uart_buffer: AtomicI32,
    uart_last: AtomicI32,
    input: Box<[i32]>,
    cursor: AtomicUsize,
}

/// Point-in-time copy of every mutable register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateView {
    pub temperature: i32,
    pub cooling_flag: bool,
    pub cooling_state: bool,
    pub uart_buffer: i32,
    pub uart_last: i32,
    pub cursor: usize,
}

impl SharedState {
    /// Load an input sequence and zero every register.
    ///
    /// # Errors
    /// [`KernelError::InputTooLong`] if `input` exceeds [`MAX_SAMPLES`].
    pub fn load(input: &[i32]) -> Result<Self, KernelError> {
        if input.len() > MAX_SAMPLES {
            return Err(KernelError::InputTooLong {
                len: input.len(),
                max: MAX_SAMPLES,
            });
        }
        Ok(Self {
            temperature: AtomicI32::new(0),
            cooling_flag: AtomicBool::new(false),
            cooling_state: AtomicBool::new(false),
            uart_buffer: AtomicI32::new(0),
            uart_last: AtomicI32::new(0),
            input: input.into(),
            cursor: AtomicUsize::new(0),
        })
    }

    // --- Input sequence and cursor ---

    /// Number of samples `N`.
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Sample at `index`, or `None` past the end.
    #[inline]
    pub fn sample(&self, index: usize) -> Option<i32> {
        self.input.get(index).copied()
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// True once the cursor has reached `N`. This is the termination signal.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor() >= self.len()
    }

    /// Move the cursor from `from` to `from + 1`.
    ///
    /// Only the Reader calls this, so a plain store is enough: no other
    /// writer can interleave between its load and this store.
    #[inline]
    pub fn advance_cursor(&self, from: usize) {
        debug_assert!(from < self.len(), "cursor advanced past the input");
        debug_assert!(from >= self.cursor(), "cursor must never move backwards");
        self.cursor.store(from + 1, Ordering::Relaxed);
    }

    // --- Registers ---

    #[inline]
    pub fn temperature(&self) -> i32 {
        self.temperature.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_temperature(&self, value: i32) {
        self.temperature.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn cooling_flag(&self) -> bool {
        self.cooling_flag.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_cooling_flag(&self, on: bool) {
        self.cooling_flag.store(on, Ordering::Relaxed);
    }

    #[inline]
    pub fn cooling_state(&self) -> bool {
        self.cooling_state.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_cooling_state(&self, on: bool) {
        self.cooling_state.store(on, Ordering::Relaxed);
    }

    #[inline]
    pub fn uart_buffer(&self) -> i32 {
        self.uart_buffer.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_uart_buffer(&self, value: i32) {
        self.uart_buffer.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn uart_last(&self) -> i32 {
        self.uart_last.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_uart_last(&self, value: i32) {
        self.uart_last.store(value, Ordering::Relaxed);
    }

    /// Copy every mutable register. Fields are read one at a time, so a
    /// view taken while tasks run on other threads may mix two instants.
    pub fn view(&self) -> StateView {
        StateView {
            temperature: self.temperature(),
            cooling_flag: self.cooling_flag(),
            cooling_state: self.cooling_state(),
            uart_buffer: self.uart_buffer(),
            uart_last: self.uart_last(),
            cursor: self.cursor(),
        }
    }
}
