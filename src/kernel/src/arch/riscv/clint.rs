//! Core-local interruptor: the machine timer and the software-interrupt bit.

use kivi_hal::{InterruptController, Timer};

const MSIP: usize = 0x0;
const MTIMECMP: usize = 0x4000;
const MTIME: usize = 0xBFF8;

/// Driver for hart 0's CLINT registers.
pub struct Clint {
    base: usize,
    quantum: u64,
}

impl Clint {
    /// Creates a driver for the CLINT mapped at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at a CLINT register block (or memory laid out like
    /// one) that stays mapped and is accessed only through this driver.
    pub const unsafe fn new(base: usize, quantum: u64) -> Self {
        Clint { base, quantum }
    }

    fn read64(&self, offset: usize) -> u64 {
        // SAFETY: `new` guarantees the register block is mapped; offsets are
        // fixed register positions within it.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u64) }
    }

    fn write64(&mut self, offset: usize, value: u64) {
        // SAFETY: see `read64`.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u64, value) }
    }

    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: see `read64`.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        // SAFETY: see `read64`.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

impl Timer for Clint {
    fn reset(&mut self) {
        let next = self.read64(MTIME).wrapping_add(self.quantum);
        self.write64(MTIMECMP, next);
    }

    fn current_ticks(&self) -> u64 {
        self.read64(MTIME)
    }

    fn expired(&self) -> bool {
        self.read64(MTIME) >= self.read64(MTIMECMP)
    }
}

impl InterruptController for Clint {
    fn raise_software(&mut self) {
        self.write32(MSIP, 1);
    }

    fn clear_software(&mut self) {
        self.write32(MSIP, 0);
    }

    fn software_pending(&self) -> bool {
        self.read32(MSIP) & 1 != 0
    }
}
