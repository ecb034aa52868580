//! Types shared between the Kivi kernel and the processes it runs.
//!
//! Everything that crosses the user/kernel boundary lives here: process
//! identifiers and the well-known service table, the fixed layout of the
//! syscall area, the typed system calls and IPC messages encoded into it, and
//! the error codes reported back to callers.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod message;
pub mod pid;
pub mod process;
pub mod syscall;

pub use error::SysError;
pub use message::{ArgList, Message, MAX_ARGC, MAX_ARG_LEN};
pub use pid::{Pid, GPID_DIR, GPID_FILE, GPID_PROCESS, GPID_SHELL, GPID_USER_START};
pub use process::{ProcFlags, ProcStatus};
pub use syscall::{Completion, Mailbox, MmioMailbox, Syscall, SyscallArea, SyscallKind};
