//! Kernel-resident services.
//!
//! Services run as ordinary processes for scheduling and IPC purposes, but
//! their code executes inside the kernel with access to its tables through a
//! [`ServiceContext`].

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use kivi_common::{Message, Pid, ProcFlags};
use kivi_sdk::{Factory, Program};
use log::debug;

use crate::ipc::Ipc;
use crate::process::ProcessTable;
use crate::sched::Scheduler;
use crate::task::{Task, TaskSet};

pub mod proc;

pub use proc::ProcessManager;

/// Programs that can be spawned, by name.
#[derive(Default, Clone)]
pub struct ProgramRegistry {
    programs: BTreeMap<&'static str, Factory>,
}

impl ProgramRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: &'static str, factory: Factory) -> &mut Self {
        self.programs.insert(name, factory);
        self
    }

    /// The factory registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<Factory> {
        self.programs.get(name).copied()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }
}

impl FromIterator<(&'static str, Factory)> for ProgramRegistry {
    fn from_iter<I: IntoIterator<Item = (&'static str, Factory)>>(iter: I) -> Self {
        ProgramRegistry {
            programs: iter.into_iter().collect(),
        }
    }
}

/// The kernel state a service may touch while handling a request.
pub struct ServiceContext<'a> {
    pub(crate) table: &'a mut ProcessTable,
    pub(crate) sched: &'a mut Scheduler,
    pub(crate) ipc: &'a mut Ipc,
    pub(crate) tasks: &'a mut TaskSet,
}

impl ServiceContext<'_> {
    /// Creates a process running `program` and makes it runnable.
    ///
    /// A full process table is fatal.
    pub fn create(
        &mut self,
        program: Box<dyn Program>,
        flags: ProcFlags,
        parent: Option<Pid>,
    ) -> Pid {
        let pid = self.table.alloc();
        if let Some(slot) = self.table.get_mut(pid) {
            slot.flags = flags;
            slot.parent = parent;
        }
        self.tasks.insert(pid, Task::new(program));
        self.sched.make_ready(self.table, pid);
        pid
    }

    /// Removes `pid` entirely: table slot, program image and IPC state.
    pub fn destroy(&mut self, pid: Pid) -> bool {
        if !self.table.free(pid) {
            return false;
        }
        self.tasks.remove(pid);
        self.ipc.forget(self.table, self.sched, pid);
        debug!("service: destroyed pid {}", pid);
        true
    }

    /// Posts a reply without blocking the service.
    pub fn reply(&mut self, from: Pid, to: Pid, msg: Message) {
        self.ipc.post(self.table, self.sched, from, to, msg);
    }

    /// The process table.
    pub fn table(&self) -> &ProcessTable {
        self.table
    }
}
