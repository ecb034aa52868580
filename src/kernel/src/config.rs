//! Kernel limits and boot-time configuration.

use alloc::string::String;
use log::LevelFilter;

/// Number of slots in the process table.
pub const MAX_NPROCESS: usize = 64;

/// Capacity of the ready queue.
///
/// Twice the table size so that stale entries left behind by destroyed
/// processes rarely force a compaction.
pub const READY_QUEUE_LEN: usize = 2 * MAX_NPROCESS;

/// Default scheduling quantum, in timer ticks.
pub const QUANTUM_TICKS: u64 = 50_000;

/// Directory a bare `cd` returns to.
pub const HOME_DIR: &str = "/home";

/// Settings fixed at boot.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Ticks between timer interrupts; handed to the timer driver.
    pub quantum_ticks: u64,
    /// Maximum level the console logger prints.
    pub log_level: LevelFilter,
    /// Home directory of the process service's built-in `cd`.
    pub home: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            quantum_ticks: QUANTUM_TICKS,
            log_level: LevelFilter::Info,
            home: String::from(HOME_DIR),
        }
    }
}

impl KernelConfig {
    /// Overrides the quantum.
    pub fn with_quantum(mut self, ticks: u64) -> Self {
        self.quantum_ticks = ticks;
        self
    }

    /// Overrides the log level.
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}
