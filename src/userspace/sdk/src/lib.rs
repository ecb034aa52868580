//! Process-side library for Kivi programs.
//!
//! A program never calls into the kernel directly. It returns the next
//! [`Syscall`] it wants to make; [`trap::invoke`] writes that request into
//! the syscall area and rings the software-interrupt doorbell, and the
//! completion is read back from the same area when the process resumes.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod request;
pub mod shell;
pub mod trap;

use alloc::boxed::Box;

pub use kivi_common::{ArgList, Completion, Message, Pid, SysError, Syscall, GPID_PROCESS};

/// A user program, written as a state machine over its system calls.
pub trait Program: Send {
    /// The first system call, made when the process runs for the first time.
    fn start(&mut self) -> Syscall;

    /// The next system call, given how the previous one completed.
    fn resume(&mut self, completion: Completion) -> Syscall;
}

/// Builds a program instance from its argument list.
///
/// Returning an error rejects the spawn request before a process is created.
pub type Factory = fn(&ArgList) -> Result<Box<dyn Program>, SysError>;
