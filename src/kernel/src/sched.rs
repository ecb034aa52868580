//! Round-robin scheduler.
//!
//! Runnable pids wait in a FIFO ready queue. Entries are not removed when a
//! process is destroyed or blocks; they go stale and are skipped when they
//! reach the head. At most one process is `Running` at any time.

use alloc::vec::Vec;

use crossbeam_queue::ArrayQueue;
use kivi_common::{Pid, ProcFlags, ProcStatus};
use log::trace;

use crate::config::READY_QUEUE_LEN;
use crate::error::{fatal, KernelError};
use crate::process::ProcessTable;

/// Ready queue plus the identity of the running process.
pub struct Scheduler {
    ready: ArrayQueue<Pid>,
    current: Option<Pid>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an idle scheduler.
    pub fn new() -> Self {
        Scheduler {
            ready: ArrayQueue::new(READY_QUEUE_LEN),
            current: None,
        }
    }

    /// The running process, if any.
    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    /// Entries in the ready queue, stale ones included.
    pub fn queued(&self) -> usize {
        self.ready.len()
    }

    /// Makes a new or blocked process runnable and queues it.
    ///
    /// Processes already runnable or running are left alone, as are pids
    /// that do not exist. Returns whether the process was queued.
    pub fn make_ready(&mut self, table: &mut ProcessTable, pid: Pid) -> bool {
        match table.status(pid) {
            None | Some(ProcStatus::Runnable) | Some(ProcStatus::Running) => false,
            Some(_) => {
                table.set_runnable(pid);
                self.enqueue(table, pid);
                true
            }
        }
    }

    /// Returns the process that should execute now.
    ///
    /// The current process keeps the CPU while it is still running.
    /// Otherwise the queue is popped until a live, runnable process that is
    /// not exiting turns up.
    pub fn schedule(&mut self, table: &mut ProcessTable) -> Option<Pid> {
        self.settle(table);
        if self.current.is_some() {
            return self.current;
        }
        while let Some(pid) = self.ready.pop() {
            let eligible = table.get(pid).map_or(false, |p| {
                p.status() == ProcStatus::Runnable && !p.flags().contains(ProcFlags::EXITING)
            });
            if !eligible {
                trace!("sched: skipping stale entry {}", pid);
                continue;
            }
            table.set_running(pid);
            self.current = Some(pid);
            trace!("sched: switch to {}", pid);
            return Some(pid);
        }
        None
    }

    /// Sends the running process to the back of the queue.
    pub fn preempt(&mut self, table: &mut ProcessTable) {
        if let Some(pid) = self.current.take() {
            if table.status(pid) == Some(ProcStatus::Running) {
                table.set_runnable(pid);
                self.enqueue(table, pid);
            }
        }
    }

    /// Forgets the current process once it has stopped running.
    pub fn settle(&mut self, table: &ProcessTable) {
        if let Some(pid) = self.current {
            if table.status(pid) != Some(ProcStatus::Running) {
                self.current = None;
            }
        }
    }

    fn enqueue(&mut self, table: &ProcessTable, pid: Pid) {
        if self.ready.push(pid).is_ok() {
            return;
        }
        self.compact(table);
        if self.ready.push(pid).is_err() {
            fatal(KernelError::ReadyQueueFull);
        }
    }

    /// Drops entries that no longer name a runnable process.
    fn compact(&mut self, table: &ProcessTable) {
        let live: Vec<Pid> = core::iter::from_fn(|| self.ready.pop())
            .filter(|pid| table.status(*pid) == Some(ProcStatus::Runnable))
            .collect();
        trace!("sched: compacted ready queue to {}", live.len());
        for pid in live {
            // Cannot fail: the queue was just drained.
            let _ = self.ready.push(pid);
        }
    }
}
