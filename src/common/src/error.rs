//! System-wide error types for Kivi.

use core::fmt;

/// Errors reported to a process as the result of a system call or request.
///
/// Each variant has a stable negative code so it can travel through the
/// `status` field of the syscall area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SysError {
    /// Argument list has more than `MAX_ARGC` entries
    TooManyArgs,
    /// An argument is longer than `MAX_ARG_LEN` bytes
    ArgTooLong,
    /// Argument list is empty
    EmptyCommand,
    /// No program registered under the requested name
    UnknownProgram,
    /// Destination or source process does not exist
    NoSuchProcess,
    /// Syscall descriptor could not be decoded
    BadSyscall,
    /// Message bytes could not be decoded
    BadMessage,
    /// Encoded message does not fit in the syscall area
    PayloadTooLarge,
    /// A program rejected its arguments
    InvalidArgument,
}

impl SysError {
    /// Stable negative code written into the syscall area.
    pub const fn code(self) -> i32 {
        match self {
            SysError::TooManyArgs => -1,
            SysError::ArgTooLong => -2,
            SysError::EmptyCommand => -3,
            SysError::UnknownProgram => -4,
            SysError::NoSuchProcess => -5,
            SysError::BadSyscall => -6,
            SysError::BadMessage => -7,
            SysError::PayloadTooLarge => -8,
            SysError::InvalidArgument => -9,
        }
    }

    /// Maps a code read back from the syscall area to an error.
    ///
    /// Unknown codes decode as `BadSyscall`.
    pub const fn from_code(code: i32) -> SysError {
        match code {
            -1 => SysError::TooManyArgs,
            -2 => SysError::ArgTooLong,
            -3 => SysError::EmptyCommand,
            -4 => SysError::UnknownProgram,
            -5 => SysError::NoSuchProcess,
            -7 => SysError::BadMessage,
            -8 => SysError::PayloadTooLarge,
            -9 => SysError::InvalidArgument,
            _ => SysError::BadSyscall,
        }
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysError::TooManyArgs => write!(f, "too many arguments"),
            SysError::ArgTooLong => write!(f, "argument too long"),
            SysError::EmptyCommand => write!(f, "empty command"),
            SysError::UnknownProgram => write!(f, "unknown program"),
            SysError::NoSuchProcess => write!(f, "no such process"),
            SysError::BadSyscall => write!(f, "malformed system call"),
            SysError::BadMessage => write!(f, "malformed message"),
            SysError::PayloadTooLarge => write!(f, "message too large"),
            SysError::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}
