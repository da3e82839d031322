//! Error types for the kernel core.
//!
//! Every failure is an input-validation failure detected before or at
//! scheduling start, except [`KernelError::SnapshotOverflow`], which the
//! instrumentation layer reports and the scheduler swallows.

use std::fmt;

/// Errors raised by the kernel core.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KernelError {
    /// Scenario identifier outside `1..=4`.
    InvalidScenario(i64),
    /// Input sequence longer than the sample buffer.
    InputTooLong { len: usize, max: usize },
    /// Snapshot buffer is full; the snapshot was not recorded.
    SnapshotOverflow { capacity: usize },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScenario(id) => {
                write!(f, "invalid scenario {id} (expected 1, 2, 3 or 4)")
            }
            Self::InputTooLong { len, max } => {
                write!(f, "input has {len} samples, at most {max} are supported")
            }
            Self::SnapshotOverflow { capacity } => {
                write!(f, "snapshot buffer full ({capacity} entries)")
            }
        }
    }
}

impl std::error::Error for KernelError {}
