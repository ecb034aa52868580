//! The syscall area: a fixed-layout region through which a process hands a
//! system call to the kernel and later reads back its completion.
//!
//! A process writes a descriptor (`kind` plus arguments) and raises the
//! software interrupt. The trap dispatcher copies the descriptor out, resets
//! `kind` to [`SyscallKind::Unused`] and dispatches it. When the process is
//! next resumed the kernel writes a [`Completion`] into the same area.

use core::ptr::NonNull;

use crate::error::SysError;
use crate::message::{ArgList, Message};
use crate::pid::Pid;

/// Size of the message payload in the syscall area.
pub const SYSCALL_MSG_LEN: usize = 512;

/// Physical address of the syscall area on the reference board.
pub const SYSCALL_AREA_BASE: usize = 0x8020_0000;

/// Descriptor tag stored in [`SyscallArea::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallKind {
    /// No pending request.
    Unused = 0,
    /// Send a message to `peer`.
    Send = 1,
    /// Receive a message from `peer`, or from anyone when `peer` is 0.
    Recv = 2,
    /// Terminate the calling process with `status`.
    Exit = 3,
    /// Start the program whose argument list is in the payload.
    Spawn = 4,
    /// Kill every non-system process.
    KillAll = 5,
    /// Give up the rest of the time slice.
    Yield = 6,
}

impl SyscallKind {
    /// Decodes a raw tag.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => SyscallKind::Unused,
            1 => SyscallKind::Send,
            2 => SyscallKind::Recv,
            3 => SyscallKind::Exit,
            4 => SyscallKind::Spawn,
            5 => SyscallKind::KillAll,
            6 => SyscallKind::Yield,
            _ => return None,
        })
    }
}

/// Memory layout of the syscall area.
#[repr(C)]
#[derive(Clone)]
pub struct SyscallArea {
    /// A [`SyscallKind`] tag.
    pub kind: u32,
    /// Destination of a send, source filter of a receive (0 = any), or the
    /// sender of a received message in a completion.
    pub peer: u32,
    /// Exit status of an exit request, or the result code of a completion.
    pub status: i32,
    /// Number of valid bytes in `payload`.
    pub len: u32,
    /// Encoded [`Message`] or [`ArgList`].
    pub payload: [u8; SYSCALL_MSG_LEN],
}

impl SyscallArea {
    /// An area with no pending request.
    pub const fn new() -> Self {
        Self {
            kind: SyscallKind::Unused as u32,
            peer: 0,
            status: 0,
            len: 0,
            payload: [0; SYSCALL_MSG_LEN],
        }
    }

    /// Copies the descriptor out and marks the area as consumed.
    pub fn take(&mut self) -> SyscallArea {
        let descriptor = self.clone();
        self.kind = SyscallKind::Unused as u32;
        descriptor
    }

    /// Whether a request is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.kind != SyscallKind::Unused as u32
    }

    fn payload(&self) -> Result<&[u8], SysError> {
        self.payload
            .get(..self.len as usize)
            .ok_or(SysError::BadSyscall)
    }

    fn put_message(&mut self, msg: &Message) -> Result<(), SysError> {
        let len = msg.encode(&mut self.payload)?;
        self.len = len as u32;
        Ok(())
    }
}

impl Default for SyscallArea {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to the syscall area of the running process.
pub trait Mailbox {
    /// The area itself.
    fn area(&mut self) -> &mut SyscallArea;
}

/// The syscall area at a fixed physical address.
pub struct MmioMailbox {
    base: NonNull<SyscallArea>,
}

impl MmioMailbox {
    /// Maps the area at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be non-null, aligned for [`SyscallArea`], and point to
    /// memory reserved for the syscall area for as long as the mailbox is
    /// alive. Nothing else may hold a reference into it concurrently.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base: NonNull::new_unchecked(base as *mut SyscallArea),
        }
    }
}

// Safety: the area is a plain memory region; exclusive access is guaranteed
// by the contract of `MmioMailbox::new` and by `&mut self` on `area`.
unsafe impl Send for MmioMailbox {}

impl Mailbox for MmioMailbox {
    fn area(&mut self) -> &mut SyscallArea {
        // Safety: see `MmioMailbox::new`.
        unsafe { self.base.as_mut() }
    }
}

/// A decoded system call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Syscall {
    /// Deliver `msg` to `dst`, blocking until it is received.
    Send {
        /// Destination process.
        dst: Pid,
        /// Message to deliver.
        msg: Message,
    },
    /// Block until a message arrives from `from`, or from anyone.
    Recv {
        /// Source filter.
        from: Option<Pid>,
    },
    /// Terminate the caller.
    Exit {
        /// Reported to the parent.
        status: i32,
    },
    /// Shorthand for sending `Message::Spawn` to the process service.
    Spawn {
        /// Program and arguments.
        argv: ArgList,
    },
    /// Shorthand for sending `Message::KillAll` to the process service.
    KillAll,
    /// Give up the CPU.
    Yield,
}

impl Syscall {
    /// The descriptor tag for this call.
    pub fn kind(&self) -> SyscallKind {
        match self {
            Syscall::Send { .. } => SyscallKind::Send,
            Syscall::Recv { .. } => SyscallKind::Recv,
            Syscall::Exit { .. } => SyscallKind::Exit,
            Syscall::Spawn { .. } => SyscallKind::Spawn,
            Syscall::KillAll => SyscallKind::KillAll,
            Syscall::Yield => SyscallKind::Yield,
        }
    }

    /// Writes the descriptor into `area`.
    ///
    /// `kind` is written last, so a failed encode leaves no request pending.
    pub fn encode(&self, area: &mut SyscallArea) -> Result<(), SysError> {
        area.peer = 0;
        area.status = 0;
        area.len = 0;
        match self {
            Syscall::Send { dst, msg } => {
                area.peer = dst.raw();
                area.put_message(msg)?;
            }
            Syscall::Recv { from } => area.peer = from.map_or(0, Pid::raw),
            Syscall::Exit { status } => area.status = *status,
            Syscall::Spawn { argv } => area.put_message(&Message::Spawn(argv.clone()))?,
            Syscall::KillAll | Syscall::Yield => {}
        }
        area.kind = self.kind() as u32;
        Ok(())
    }

    /// Decodes a descriptor; `Ok(None)` means no request was pending.
    pub fn decode(area: &SyscallArea) -> Result<Option<Syscall>, SysError> {
        let kind = SyscallKind::from_raw(area.kind).ok_or(SysError::BadSyscall)?;
        let call = match kind {
            SyscallKind::Unused => return Ok(None),
            SyscallKind::Send => Syscall::Send {
                dst: Pid::from_raw(area.peer).ok_or(SysError::NoSuchProcess)?,
                msg: Message::decode(area.payload()?)?,
            },
            SyscallKind::Recv => Syscall::Recv {
                from: Pid::from_raw(area.peer),
            },
            SyscallKind::Exit => Syscall::Exit {
                status: area.status,
            },
            SyscallKind::Spawn => match Message::decode(area.payload()?)? {
                Message::Spawn(argv) => Syscall::Spawn { argv },
                _ => return Err(SysError::BadSyscall),
            },
            SyscallKind::KillAll => Syscall::KillAll,
            SyscallKind::Yield => Syscall::Yield,
        };
        Ok(Some(call))
    }
}

/// Result of a system call, handed back when the caller resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The call finished without producing a message.
    Done,
    /// A receive finished.
    Received {
        /// Sender of the message.
        from: Pid,
        /// The message.
        msg: Message,
    },
    /// The call failed.
    Failed(SysError),
}

impl Completion {
    /// Publishes the completion into the reply fields of `area`.
    pub fn write(&self, area: &mut SyscallArea) {
        area.kind = SyscallKind::Unused as u32;
        area.peer = 0;
        area.status = 0;
        area.len = 0;
        match self {
            Completion::Done => {}
            Completion::Received { from, msg } => {
                if let Err(err) = area.put_message(msg) {
                    area.status = err.code();
                } else {
                    area.peer = from.raw();
                }
            }
            Completion::Failed(err) => area.status = err.code(),
        }
    }

    /// Reads a completion written by [`Completion::write`].
    pub fn read(area: &SyscallArea) -> Completion {
        if area.status < 0 {
            return Completion::Failed(SysError::from_code(area.status));
        }
        match Pid::from_raw(area.peer) {
            None => Completion::Done,
            Some(from) => match area.payload().and_then(Message::decode) {
                Ok(msg) => Completion::Received { from, msg },
                Err(err) => Completion::Failed(err),
            },
        }
    }
}
