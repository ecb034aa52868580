//! Interrupt identification at the trap entry.

use crate::arch::riscv::{INTR_ID_SOFT, INTR_ID_TMR};
use crate::error::KernelError;

/// The interrupts the kernel handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Preemption tick.
    Timer,
    /// System-call doorbell.
    Software,
}

impl Interrupt {
    /// Maps a machine interrupt cause to an [`Interrupt`].
    pub fn classify(id: u32) -> Result<Interrupt, KernelError> {
        match id {
            INTR_ID_TMR => Ok(Interrupt::Timer),
            INTR_ID_SOFT => Ok(Interrupt::Software),
            other => Err(KernelError::UnknownInterrupt(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_causes() {
        assert_eq!(Interrupt::classify(7), Ok(Interrupt::Timer));
        assert_eq!(Interrupt::classify(3), Ok(Interrupt::Software));
        assert_eq!(
            Interrupt::classify(11),
            Err(KernelError::UnknownInterrupt(11))
        );
    }
}
