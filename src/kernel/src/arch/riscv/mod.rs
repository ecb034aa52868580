//! RISC-V machine-mode definitions.

pub mod clint;

pub use clint::Clint;

use alloc::boxed::Box;
use alloc::vec::Vec;

use kivi_common::syscall::SYSCALL_AREA_BASE;
use kivi_common::MmioMailbox;
use kivi_hal::Console;
use kivi_sdk::Program;

use crate::config::KernelConfig;
use crate::kernel::Kernel;
use crate::machine::Machine;
use crate::service::ProgramRegistry;

/// Machine software interrupt cause.
pub const INTR_ID_SOFT: u32 = 3;

/// Machine timer interrupt cause.
pub const INTR_ID_TMR: u32 = 7;

/// Base of the core-local interruptor on the reference board.
pub const CLINT_BASE: usize = 0x0200_0000;

/// Drivers for the reference board's fixed memory map.
///
/// # Safety
///
/// The CLINT must be mapped at [`CLINT_BASE`] and the syscall area at
/// `SYSCALL_AREA_BASE`. Call at most once; the drivers assume exclusive
/// access to both regions.
pub unsafe fn board(config: &KernelConfig) -> (Clint, MmioMailbox) {
    (
        Clint::new(CLINT_BASE, config.quantum_ticks),
        MmioMailbox::new(SYSCALL_AREA_BASE),
    )
}

/// Brings up the kernel on the reference board and boots `services`.
///
/// # Safety
///
/// Same requirements as [`board`].
pub unsafe fn start<Con>(
    console: Con,
    config: KernelConfig,
    registry: ProgramRegistry,
    services: Vec<Box<dyn Program>>,
) -> Machine<Clint, MmioMailbox>
where
    Con: Console + Send + 'static,
{
    crate::init(console, &config);
    let (clint, mailbox) = board(&config);
    let mut kernel = Kernel::new(clint, mailbox, registry, config);
    kernel.boot(services);
    Machine::new(kernel)
}
