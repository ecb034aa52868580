//! `sleep N`: gives up the CPU `N` times, then exits.

use alloc::boxed::Box;

use kivi_sdk::{request, ArgList, Completion, Program, SysError, Syscall};

/// Builds a `sleep` process. The count defaults to 1.
pub fn factory(argv: &ArgList) -> Result<Box<dyn Program>, SysError> {
    let remaining = match crate::operands(argv) {
        [] => 1,
        [count] => count.parse().map_err(|_| SysError::InvalidArgument)?,
        _ => return Err(SysError::InvalidArgument),
    };
    Ok(Box::new(Sleep { remaining }))
}

/// The `sleep` program.
pub struct Sleep {
    remaining: u32,
}

impl Sleep {
    fn next(&mut self) -> Syscall {
        if self.remaining == 0 {
            return request::exit(0);
        }
        self.remaining -= 1;
        Syscall::Yield
    }
}

impl Program for Sleep {
    fn start(&mut self) -> Syscall {
        self.next()
    }

    fn resume(&mut self, _: Completion) -> Syscall {
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_then_exits() {
        let argv = ArgList::new(["sleep", "2", "&"]).unwrap();
        let mut sleep = factory(&argv).unwrap();
        assert_eq!(sleep.start(), Syscall::Yield);
        assert_eq!(sleep.resume(Completion::Done), Syscall::Yield);
        assert_eq!(sleep.resume(Completion::Done), Syscall::Exit { status: 0 });
    }

    #[test]
    fn rejects_bad_counts() {
        for line in [["sleep", "soon"].as_slice(), &["sleep", "1", "2"]] {
            let argv = ArgList::new(line.iter().copied()).unwrap();
            assert_eq!(factory(&argv).err(), Some(SysError::InvalidArgument));
        }
    }
}
