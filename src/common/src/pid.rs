//! Process identifiers and the table of well-known service pids.

use core::fmt;

/// A process identifier.
///
/// Pids are positive and handed out from a counter that never resets, so a
/// pid names at most one process for the lifetime of the system. Zero is
/// reserved for "no process" and cannot be represented by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid(u32);

impl Pid {
    /// Wraps a raw pid, returning `None` for zero.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Pid(raw))
        }
    }

    /// The raw value as written into the syscall area.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this pid belongs to a user process rather than a service.
    pub const fn is_user(self) -> bool {
        self.0 >= GPID_USER_START.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The process-management service.
pub const GPID_PROCESS: Pid = Pid(1);
/// The file service.
pub const GPID_FILE: Pid = Pid(2);
/// The directory service.
pub const GPID_DIR: Pid = Pid(3);
/// The shell.
pub const GPID_SHELL: Pid = Pid(4);
/// First pid handed to a user program.
pub const GPID_USER_START: Pid = Pid(5);

/// Symbolic service names and the pids they are configured at.
///
/// The boot sequence launches the services in this order, which is what
/// makes their monotonically assigned pids line up with this table.
pub const WELL_KNOWN: [(&str, Pid); 4] = [
    ("process", GPID_PROCESS),
    ("file", GPID_FILE),
    ("dir", GPID_DIR),
    ("shell", GPID_SHELL),
];

/// Looks up a service pid by name.
pub fn resolve(name: &str) -> Option<Pid> {
    WELL_KNOWN
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, pid)| *pid)
}

/// Reverse lookup of [`resolve`].
pub fn service_name(pid: Pid) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(_, p)| *p == pid)
        .map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_pid() {
        assert!(Pid::from_raw(0).is_none());
        assert_eq!(Pid::from_raw(7).map(Pid::raw), Some(7));
    }

    #[test]
    fn well_known_table_is_dense_from_one() {
        for (i, (_, pid)) in WELL_KNOWN.iter().enumerate() {
            assert_eq!(pid.raw() as usize, i + 1);
            assert!(!pid.is_user());
        }
        assert_eq!(GPID_USER_START.raw() as usize, WELL_KNOWN.len() + 1);
    }

    #[test]
    fn resolve_by_name() {
        assert_eq!(resolve("process"), Some(GPID_PROCESS));
        assert_eq!(resolve("shell"), Some(GPID_SHELL));
        assert_eq!(resolve("printer"), None);
        assert_eq!(service_name(GPID_DIR), Some("dir"));
        assert_eq!(service_name(GPID_USER_START), None);
    }
}
