//! # Synchronization Primitives
//!
//! Critical-section abstractions for state that concurrent writers must
//! not interleave on. Only the instrumentation collector lives behind one;
//! the shared state region is deliberately unsynchronized.
//!
//! The `critical-section` crate is built with its `std` implementation, so
//! a critical section is a process-wide lock when tasks run on host
//! threads, and free of contention in the cooperative model.

use core::cell::RefCell;

pub use critical_section::{CriticalSection, Mutex};

/// Execute a closure within a critical section.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     // Access shared state safely
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

/// Mutably borrow the value guarded by `cell` for the duration of `f`.
#[inline]
pub fn with_locked<T, F, R>(cell: &Mutex<RefCell<T>>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    critical_section(|cs| f(&mut *cell.borrow_ref_mut(cs)))
}
