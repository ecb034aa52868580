//! Kivi kernel.
//!
//! A small message-passing kernel for a single RISC-V hart.
//!
//! # Architecture
//!
//! - `process`: the fixed-size process table
//! - `sched`: round-robin scheduling over a ready queue
//! - `ipc`: rendezvous `send`/`recv` plus non-blocking service replies
//! - `kernel`: trap dispatch for the timer and the syscall doorbell
//! - `service`: the process-management service
//! - `machine`: the loop that runs processes on a hart
//! - `arch`: CLINT driver, interrupt numbers and board bring-up
//!   (`arch::riscv::start`)
//!
//! # Safety
//!
//! Device registers are only touched by `arch::riscv::Clint`; its unsafe
//! blocks document the invariants they rely on.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod logger;
pub mod machine;
pub mod process;
pub mod sched;
pub mod service;
pub mod task;
pub mod testutil;
pub mod trap;

pub use config::KernelConfig;
pub use error::{fatal, KernelError};
pub use kernel::Kernel;
pub use machine::{Machine, Step};
pub use service::{ProcessManager, ProgramRegistry};

use kivi_hal::Console;
use log::info;

/// Initializes core kernel subsystems.
///
/// Routes log output to `console` at the configured level. Called once,
/// before the kernel is booted.
pub fn init<C>(console: C, config: &KernelConfig)
where
    C: Console + Send + 'static,
{
    logger::init(console, config.log_level);
    info!(
        "kivi: log level {}, quantum {} ticks",
        config.log_level, config.quantum_ticks
    );
}
