//! Architecture-specific code.

pub mod riscv;
