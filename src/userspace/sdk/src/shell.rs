//! Turning a command line into a request for the process service.

use kivi_common::{ArgList, SysError, Syscall};

use crate::request;

/// Commands the process service completes on its own, without a process.
pub const BUILTINS: [&str; 1] = ["cd"];

/// The command line that kills every user process.
pub const KILLALL: &str = "killall";

/// Whether `program` is handled inside the process service.
pub fn is_builtin(program: &str) -> bool {
    BUILTINS.contains(&program)
}

/// Splits a command line on whitespace into a bounded argument list.
pub fn split(line: &str) -> Result<ArgList, SysError> {
    ArgList::new(line.split_whitespace())
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `killall`
    KillAll,
    /// Anything else: start a program.
    Spawn(ArgList),
}

impl Request {
    /// Parses a line; blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Request>, SysError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if line == KILLALL {
            return Ok(Some(Request::KillAll));
        }
        split(line).map(|argv| Some(Request::Spawn(argv)))
    }

    /// The system call that sends this request.
    pub fn syscall(&self) -> Syscall {
        match self {
            Request::KillAll => request::kill_all(),
            Request::Spawn(argv) => request::spawn(argv.clone()),
        }
    }

    /// How many replies to wait for once the request has been accepted.
    ///
    /// A foreground program answers twice: the acknowledgement, then its
    /// completion. Built-ins, `killall` and backgrounded commands answer
    /// once. A rejected request is always answered once.
    pub fn expected_replies(&self) -> usize {
        match self {
            Request::KillAll => 1,
            Request::Spawn(argv) if is_builtin(argv.program()) || argv.is_background() => 1,
            Request::Spawn(_) => 2,
        }
    }
}
