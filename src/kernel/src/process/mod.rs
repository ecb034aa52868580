//! The process table.
//!
//! A fixed array of [`MAX_NPROCESS`] slots. Pids come from a counter that
//! only advances on a successful allocation and never reuses a value, so a
//! stale pid can be detected by looking it up: lookups match on the pid,
//! not on the slot index.

use kivi_common::{Pid, ProcFlags, ProcStatus};
use log::{debug, trace};

use crate::config::MAX_NPROCESS;
use crate::error::{fatal, KernelError};
use crate::ipc::IpcState;

/// One process-table slot.
#[derive(Debug, Default)]
pub struct Process {
    pub(crate) pid: Option<Pid>,
    pub(crate) status: ProcStatus,
    pub(crate) flags: ProcFlags,
    pub(crate) parent: Option<Pid>,
    pub(crate) ipc: IpcState,
}

impl Process {
    /// The pid occupying this slot, or `None` if the slot is free.
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    /// Current scheduling status.
    pub fn status(&self) -> ProcStatus {
        self.status
    }

    /// Creation flags.
    pub fn flags(&self) -> ProcFlags {
        self.flags
    }

    /// The process that asked for this one to be spawned, if any.
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Whether this process survives kill-all.
    pub fn is_system(&self) -> bool {
        self.flags.contains(ProcFlags::SYSTEM)
    }

    fn is_free(&self) -> bool {
        self.pid.is_none()
    }
}

/// Fixed-capacity table of processes.
pub struct ProcessTable {
    slots: [Process; MAX_NPROCESS],
    last_pid: u32,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    /// An empty table; the first pid handed out is 1.
    pub fn new() -> Self {
        ProcessTable {
            slots: core::array::from_fn(|_| Process::default()),
            last_pid: 0,
        }
    }

    /// Claims a free slot for a new pid.
    ///
    /// The slot is left `Unused` until the scheduler activates it. When the
    /// table is full, or every pid has been handed out, nothing is modified,
    /// including the pid counter.
    pub fn try_alloc(&mut self) -> Result<Pid, KernelError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|p| p.is_free())
            .ok_or(KernelError::TableFull)?;
        let pid = self
            .last_pid
            .checked_add(1)
            .and_then(Pid::from_raw)
            .ok_or(KernelError::PidsExhausted)?;
        self.last_pid = pid.raw();
        *slot = Process {
            pid: Some(pid),
            ..Process::default()
        };
        debug!("proc: allocated pid {}", pid);
        Ok(pid)
    }

    /// Like [`try_alloc`](Self::try_alloc), but a full table is fatal.
    pub fn alloc(&mut self) -> Pid {
        self.try_alloc().unwrap_or_else(|err| fatal(err))
    }

    /// Releases the slot held by `pid`. Returns `false` if there was none.
    pub fn free(&mut self, pid: Pid) -> bool {
        match self.get_mut(pid) {
            Some(slot) => {
                *slot = Process::default();
                debug!("proc: freed pid {}", pid);
                true
            }
            None => false,
        }
    }

    /// Marks `pid` as the running process. No-op for an unknown pid.
    pub fn set_running(&mut self, pid: Pid) -> bool {
        self.set_status(pid, ProcStatus::Running)
    }

    /// Marks `pid` as runnable. No-op for an unknown pid.
    pub fn set_runnable(&mut self, pid: Pid) -> bool {
        self.set_status(pid, ProcStatus::Runnable)
    }

    pub(crate) fn set_status(&mut self, pid: Pid, status: ProcStatus) -> bool {
        match self.get_mut(pid) {
            Some(slot) => {
                trace!("proc: pid {} {:?} -> {:?}", pid, slot.status, status);
                slot.status = status;
                true
            }
            None => false,
        }
    }

    /// The slot holding `pid`.
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.slots.iter().find(|p| p.pid == Some(pid))
    }

    /// Mutable access to the slot holding `pid`.
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.slots.iter_mut().find(|p| p.pid == Some(pid))
    }

    /// Status of `pid`, or `None` if it does not exist.
    pub fn status(&self, pid: Pid) -> Option<ProcStatus> {
        self.get(pid).map(Process::status)
    }

    /// Whether `pid` names a live process.
    pub fn contains(&self, pid: Pid) -> bool {
        self.get(pid).is_some()
    }

    /// Occupied slots, in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().filter(|p| !p.is_free())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.slots.iter_mut().filter(|p| !p.is_free())
    }

    /// Number of live processes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the table holds no process.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn pids_increase_from_one() {
        let mut table = ProcessTable::new();
        let pids: Vec<u32> = (0..4).map(|_| table.alloc().raw()).collect();
        assert_eq!(pids, [1, 2, 3, 4]);
        assert_eq!(table.status(Pid::from_raw(1).unwrap()), Some(ProcStatus::Unused));
    }

    #[test]
    fn freed_pids_are_not_reused() {
        let mut table = ProcessTable::new();
        let a = table.alloc();
        assert!(table.free(a));
        let b = table.alloc();
        assert_ne!(a, b);
        assert!(table.get(a).is_none());
        assert!(!table.free(a));
    }

    #[test]
    fn full_table_is_left_untouched() {
        let mut table = ProcessTable::new();
        for _ in 0..MAX_NPROCESS {
            table.alloc();
        }
        assert_eq!(table.len(), MAX_NPROCESS);
        assert_eq!(table.try_alloc(), Err(KernelError::TableFull));
        assert_eq!(table.len(), MAX_NPROCESS);

        // The failed attempt did not consume a pid.
        table.free(Pid::from_raw(10).unwrap());
        assert_eq!(table.alloc().raw(), MAX_NPROCESS as u32 + 1);
    }

    #[test]
    fn exhausted_pid_counter_is_refused() {
        let mut table = ProcessTable::new();
        table.last_pid = u32::MAX - 1;
        assert_eq!(table.alloc().raw(), u32::MAX);
        assert_eq!(table.try_alloc(), Err(KernelError::PidsExhausted));
        assert_eq!(table.len(), 1);
        assert_eq!(table.last_pid, u32::MAX);
    }

    #[test]
    #[should_panic(expected = "process table full")]
    fn alloc_past_capacity_is_fatal() {
        let mut table = ProcessTable::new();
        for _ in 0..=MAX_NPROCESS {
            table.alloc();
        }
    }

    #[test]
    fn status_changes_ignore_unknown_pids() {
        let mut table = ProcessTable::new();
        let pid = table.alloc();
        let ghost = Pid::from_raw(99).unwrap();

        assert!(table.set_runnable(pid));
        assert_eq!(table.status(pid), Some(ProcStatus::Runnable));
        assert!(table.set_running(pid));
        assert_eq!(table.status(pid), Some(ProcStatus::Running));

        assert!(!table.set_running(ghost));
        assert!(!table.set_runnable(ghost));
        assert_eq!(table.len(), 1);
    }
}
