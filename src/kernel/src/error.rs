//! Kernel-internal errors and the fatal-error path.

use core::fmt;

use kivi_common::Pid;
use log::error;

/// Conditions the kernel cannot recover from.
///
/// None of these are reported to a process; they end in [`fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Every process-table slot is occupied.
    TableFull,
    /// The pid counter has no values left.
    PidsExhausted,
    /// The trap entry saw an interrupt id it does not handle.
    UnknownInterrupt(u32),
    /// A system call arrived while no process was running.
    NoRunningProcess,
    /// A boot-time service did not land on its configured pid.
    WellKnownMismatch {
        /// Pid the service is configured at.
        expected: Pid,
        /// Pid the table handed out.
        got: Pid,
    },
    /// The ready queue is full even after dropping stale entries.
    ReadyQueueFull,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::TableFull => write!(f, "process table full"),
            KernelError::PidsExhausted => write!(f, "pid space exhausted"),
            KernelError::UnknownInterrupt(id) => write!(f, "unknown interrupt id {}", id),
            KernelError::NoRunningProcess => write!(f, "system call with no running process"),
            KernelError::WellKnownMismatch { expected, got } => {
                write!(f, "service expected at pid {} started as pid {}", expected, got)
            }
            KernelError::ReadyQueueFull => write!(f, "ready queue full"),
        }
    }
}

/// Logs `err` and halts the kernel.
pub fn fatal(err: KernelError) -> ! {
    error!("fatal: {}", err);
    panic!("kernel fatal: {}", err)
}
