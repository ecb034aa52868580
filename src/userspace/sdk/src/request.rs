//! Requests to the process-management service.
//!
//! Process management is not a kernel entry point of its own; these helpers
//! only build messages addressed to the well-known service pid.

use kivi_common::{ArgList, Message, Pid, Syscall, GPID_PROCESS};

/// Ask the service to start `argv`.
pub fn spawn(argv: ArgList) -> Syscall {
    Syscall::Send {
        dst: GPID_PROCESS,
        msg: Message::Spawn(argv),
    }
}

/// Ask the service to kill every non-system process.
pub fn kill_all() -> Syscall {
    Syscall::Send {
        dst: GPID_PROCESS,
        msg: Message::KillAll,
    }
}

/// Wait for the service's next reply.
pub fn await_reply() -> Syscall {
    Syscall::Recv {
        from: Some(GPID_PROCESS),
    }
}

/// Send opaque bytes to another process.
pub fn data(dst: Pid, bytes: &[u8]) -> Syscall {
    Syscall::Send {
        dst,
        msg: Message::Data(bytes.into()),
    }
}

/// Terminate the calling process.
pub fn exit(status: i32) -> Syscall {
    Syscall::Exit { status }
}
