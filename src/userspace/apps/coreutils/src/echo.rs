//! `echo`: prints its arguments and exits.

use alloc::boxed::Box;
use alloc::string::String;

use kivi_sdk::{request, ArgList, Completion, Program, SysError, Syscall};
use log::info;

/// Builds an `echo` process.
pub fn factory(argv: &ArgList) -> Result<Box<dyn Program>, SysError> {
    Ok(Box::new(Echo {
        text: crate::operands(argv).join(" "),
    }))
}

/// The `echo` program.
pub struct Echo {
    text: String,
}

impl Program for Echo {
    fn start(&mut self) -> Syscall {
        info!("{}", self.text);
        request::exit(0)
    }

    fn resume(&mut self, _: Completion) -> Syscall {
        request::exit(0)
    }
}
