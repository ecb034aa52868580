//! Standard Kivi programs: the shell and the commands it can start.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod echo;
pub mod shell;
pub mod sleep;

use kivi_sdk::Factory;

pub use shell::{History, Shell, ShellEvent};

/// Spawnable programs, by name.
pub const PROGRAMS: [(&str, Factory); 2] = [
    ("echo", echo::factory as Factory),
    ("sleep", sleep::factory as Factory),
];

/// Arguments after the program name, minus a trailing background marker.
pub(crate) fn operands(argv: &kivi_sdk::ArgList) -> &[alloc::string::String] {
    let args = &argv.args()[1..];
    match args.split_last() {
        Some((_, rest)) if argv.is_background() => rest,
        _ => args,
    }
}
