//! IPC messages exchanged between processes and services.
//!
//! A message is a tag followed by a tag-specific payload. The encoding is
//! little-endian and unpadded:
//!
//! | tag | message    | payload                                   |
//! |-----|------------|-------------------------------------------|
//! | 1   | `Spawn`    | `argc: u8`, then `len: u8` + bytes per arg |
//! | 2   | `KillAll`  | none                                      |
//! | 3   | `Exit`     | `status: i32`                             |
//! | 4   | `CmdOk`    | none                                      |
//! | 5   | `CmdError` | none                                      |
//! | 6   | `Exited`   | `pid: u32`, `status: i32`                 |
//! | 7   | `Data`     | raw bytes                                 |

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::SysError;
use crate::pid::Pid;

/// Maximum number of arguments in a spawn request.
pub const MAX_ARGC: usize = 8;

/// Maximum length of a single argument, in bytes.
pub const MAX_ARG_LEN: usize = 32;

/// Leading character of the final argument that backgrounds a command.
pub const BACKGROUND_MARKER: char = '&';

/// A validated, bounded argument list; `args()[0]` names the program.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArgList(Vec<String>);

impl ArgList {
    /// Builds an argument list, enforcing the count and length bounds.
    pub fn new<I, S>(args: I) -> Result<Self, SysError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Vec::new();
        for arg in args {
            let arg = arg.into();
            if list.len() == MAX_ARGC {
                return Err(SysError::TooManyArgs);
            }
            if arg.len() > MAX_ARG_LEN {
                return Err(SysError::ArgTooLong);
            }
            list.push(arg);
        }
        if list.is_empty() {
            return Err(SysError::EmptyCommand);
        }
        Ok(ArgList(list))
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    /// All arguments, program name included.
    pub fn args(&self) -> &[String] {
        &self.0
    }

    /// Number of arguments, program name included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; an `ArgList` holds at least the program name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the final argument carries the background marker.
    pub fn is_background(&self) -> bool {
        self.0
            .last()
            .map_or(false, |arg| arg.starts_with(BACKGROUND_MARKER))
    }
}

/// A message carried by `send`/`recv`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    /// Ask the process service to start a program.
    Spawn(ArgList),
    /// Ask the process service to kill every non-system process.
    KillAll,
    /// Sent on behalf of a process that exits.
    Exit {
        /// Exit status reported by the process.
        status: i32,
    },
    /// Request accepted.
    CmdOk,
    /// Request rejected.
    CmdError,
    /// A spawned program finished; the final reply to its parent.
    Exited {
        /// The program that exited.
        pid: Pid,
        /// Its exit status.
        status: i32,
    },
    /// Opaque payload between user processes.
    Data(Vec<u8>),
}

const TAG_SPAWN: u32 = 1;
const TAG_KILLALL: u32 = 2;
const TAG_EXIT: u32 = 3;
const TAG_CMD_OK: u32 = 4;
const TAG_CMD_ERROR: u32 = 5;
const TAG_EXITED: u32 = 6;
const TAG_DATA: u32 = 7;

impl Message {
    /// Encodes the message into `buf`, returning the number of bytes used.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, SysError> {
        let mut w = Writer { buf, pos: 0 };
        match self {
            Message::Spawn(argv) => {
                w.put_u32(TAG_SPAWN)?;
                w.put_u8(argv.len() as u8)?;
                for arg in argv.args() {
                    w.put_u8(arg.len() as u8)?;
                    w.put_bytes(arg.as_bytes())?;
                }
            }
            Message::KillAll => w.put_u32(TAG_KILLALL)?,
            Message::Exit { status } => {
                w.put_u32(TAG_EXIT)?;
                w.put_i32(*status)?;
            }
            Message::CmdOk => w.put_u32(TAG_CMD_OK)?,
            Message::CmdError => w.put_u32(TAG_CMD_ERROR)?,
            Message::Exited { pid, status } => {
                w.put_u32(TAG_EXITED)?;
                w.put_u32(pid.raw())?;
                w.put_i32(*status)?;
            }
            Message::Data(bytes) => {
                w.put_u32(TAG_DATA)?;
                w.put_bytes(bytes)?;
            }
        }
        Ok(w.pos)
    }

    /// Decodes a message previously produced by [`Message::encode`].
    pub fn decode(buf: &[u8]) -> Result<Self, SysError> {
        let mut r = Reader { buf, pos: 0 };
        let msg = match r.u32()? {
            TAG_SPAWN => {
                let argc = r.u8()? as usize;
                let mut args = Vec::with_capacity(argc.min(MAX_ARGC));
                for _ in 0..argc {
                    let len = r.u8()? as usize;
                    let bytes = r.bytes(len)?;
                    let arg = core::str::from_utf8(bytes).map_err(|_| SysError::BadMessage)?;
                    args.push(String::from(arg));
                }
                Message::Spawn(ArgList::new(args)?)
            }
            TAG_KILLALL => Message::KillAll,
            TAG_EXIT => Message::Exit { status: r.i32()? },
            TAG_CMD_OK => Message::CmdOk,
            TAG_CMD_ERROR => Message::CmdError,
            TAG_EXITED => {
                let pid = Pid::from_raw(r.u32()?).ok_or(SysError::BadMessage)?;
                Message::Exited {
                    pid,
                    status: r.i32()?,
                }
            }
            TAG_DATA => Message::Data(r.rest().to_vec()),
            _ => return Err(SysError::BadMessage),
        };
        if !r.done() {
            return Err(SysError::BadMessage);
        }
        Ok(msg)
    }
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), SysError> {
        let end = self.pos + bytes.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(SysError::PayloadTooLarge)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn put_u8(&mut self, v: u8) -> Result<(), SysError> {
        self.put_bytes(&[v])
    }

    fn put_u32(&mut self, v: u32) -> Result<(), SysError> {
        self.put_bytes(&v.to_le_bytes())
    }

    fn put_i32(&mut self, v: i32) -> Result<(), SysError> {
        self.put_bytes(&v.to_le_bytes())
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], SysError> {
        let end = self.pos + len;
        let out = self.buf.get(self.pos..end).ok_or(SysError::BadMessage)?;
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SysError> {
        Ok(self.bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, SysError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn i32(&mut self) -> Result<i32, SysError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes(4)?);
        Ok(i32::from_le_bytes(raw))
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    fn done(&self) -> bool {
        self.pos == self.buf.len()
    }
}
