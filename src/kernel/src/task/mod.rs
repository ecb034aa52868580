//! The program images bound to live processes.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use kivi_common::{Completion, Pid, Syscall};
use kivi_sdk::Program;

/// A program instance plus whether it has run yet.
pub struct Task {
    program: Box<dyn Program>,
    started: bool,
}

impl Task {
    /// Wraps a freshly built program.
    pub fn new(program: Box<dyn Program>) -> Task {
        Task {
            program,
            started: false,
        }
    }

    /// Runs the program up to its next system call.
    ///
    /// The first step enters at [`Program::start`] and ignores `completion`.
    pub fn step(&mut self, completion: Completion) -> Syscall {
        if self.started {
            self.program.resume(completion)
        } else {
            self.started = true;
            self.program.start()
        }
    }
}

/// Tasks keyed by the pid they run as.
#[derive(Default)]
pub struct TaskSet {
    tasks: BTreeMap<Pid, Task>,
}

impl TaskSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `task` to `pid`, replacing anything bound before.
    pub fn insert(&mut self, pid: Pid, task: Task) {
        self.tasks.insert(pid, task);
    }

    /// Drops the task bound to `pid`.
    pub fn remove(&mut self, pid: Pid) -> Option<Task> {
        self.tasks.remove(&pid)
    }

    /// The task bound to `pid`.
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Task> {
        self.tasks.get_mut(&pid)
    }

    /// Number of bound tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is bound.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
