//! Kivi Hardware Abstraction Layer (HAL) traits.
//!
//! The kernel core only needs three things from the board: a timer that can
//! be re-armed for the next preemption tick, the software-interrupt doorbell
//! used for system calls, and a console for diagnostics.

#![no_std]

/// Trait for the preemption timer.
pub trait Timer {
    /// Re-arms the timer so the next tick fires one quantum from now.
    fn reset(&mut self);
    /// Returns the number of ticks since the system started.
    fn current_ticks(&self) -> u64;
    /// Whether the armed deadline has passed.
    fn expired(&self) -> bool;
}

/// Trait for the software-interrupt line that carries system calls.
pub trait InterruptController {
    /// Sets the software-interrupt pending bit (the syscall doorbell).
    fn raise_software(&mut self);
    /// Clears the software-interrupt pending bit.
    fn clear_software(&mut self);
    /// Whether a software interrupt is pending.
    fn software_pending(&self) -> bool;
}

/// Trait for a text-based console output.
pub trait Console {
    /// Writes a string to the console.
    fn write_str(&mut self, s: &str);
}
