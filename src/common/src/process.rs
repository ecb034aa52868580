//! Process status and creation flags.

use bitflags::bitflags;

/// Scheduling status of a process-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcStatus {
    /// Slot is free, or allocated but not yet activated.
    #[default]
    Unused,
    /// Waiting in the ready queue.
    Runnable,
    /// The one process currently executing.
    Running,
    /// Blocked in `send` until the destination receives.
    WaitToSend,
    /// Blocked in `recv` until a matching message arrives.
    WaitToRecv,
}

impl ProcStatus {
    /// Whether the process is parked in an IPC rendezvous.
    pub const fn is_blocked(self) -> bool {
        matches!(self, ProcStatus::WaitToSend | ProcStatus::WaitToRecv)
    }
}

bitflags! {
    /// Attributes attached to a process when it is created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcFlags: u32 {
        const SYSTEM     = 1 << 0; // survives kill-all
        const BACKGROUND = 1 << 1; // spawned with the `&` marker
        const EXITING    = 1 << 2; // exit requested, never resumed again
    }
}
