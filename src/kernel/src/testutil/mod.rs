//! Test doubles for running the kernel on the host.
//!
//! ```rust,ignore
//! use kivi_kernel::testutil::{machine, Script};
//! ```

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use kivi_common::{Completion, Mailbox, SyscallArea, Syscall};
use kivi_hal::{Console, InterruptController, Timer};
use kivi_sdk::Program;
use spin::Mutex;

use crate::config::KernelConfig;
use crate::kernel::Kernel;
use crate::machine::Machine;
use crate::service::ProgramRegistry;

/// Quantum used by [`machine`], in machine steps.
pub const TEST_QUANTUM: u64 = 4;

/// In-memory CLINT. Every poll of [`Timer::expired`] is one tick.
#[derive(Debug, Default)]
pub struct MockClint {
    mtime: AtomicU64,
    mtimecmp: u64,
    quantum: u64,
    msip: bool,
    resets: usize,
}

impl MockClint {
    /// A stopped timer; call `reset` to arm it.
    pub fn new(quantum: u64) -> Self {
        MockClint {
            mtimecmp: u64::MAX,
            quantum,
            ..Default::default()
        }
    }

    /// How many times the timer has been re-armed.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// The armed deadline.
    pub fn deadline(&self) -> u64 {
        self.mtimecmp
    }
}

impl Timer for MockClint {
    fn reset(&mut self) {
        self.mtimecmp = self.mtime.load(Ordering::Relaxed) + self.quantum;
        self.resets += 1;
    }

    fn current_ticks(&self) -> u64 {
        self.mtime.load(Ordering::Relaxed)
    }

    fn expired(&self) -> bool {
        self.mtime.fetch_add(1, Ordering::Relaxed) + 1 >= self.mtimecmp
    }
}

impl InterruptController for MockClint {
    fn raise_software(&mut self) {
        self.msip = true;
    }

    fn clear_software(&mut self) {
        self.msip = false;
    }

    fn software_pending(&self) -> bool {
        self.msip
    }
}

/// Syscall area on the heap.
pub struct MemMailbox(Box<SyscallArea>);

impl MemMailbox {
    /// A zeroed area.
    pub fn new() -> Self {
        MemMailbox(Box::default())
    }
}

impl Default for MemMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox for MemMailbox {
    fn area(&mut self) -> &mut SyscallArea {
        &mut self.0
    }
}

/// Console that keeps every line written to it.
#[derive(Clone, Default)]
pub struct RecordingConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingConsole {
    /// Shared handle to the recorded lines.
    pub fn lines(&self) -> Arc<Mutex<Vec<String>>> {
        self.lines.clone()
    }
}

impl Console for RecordingConsole {
    fn write_str(&mut self, s: &str) {
        self.lines.lock().push(s.to_string());
    }
}

/// Completions observed by a [`Script`].
pub type Transcript = Arc<Mutex<Vec<Completion>>>;

/// A program that issues a fixed list of system calls.
///
/// Each completion is recorded. When the list runs out the script keeps
/// issuing its final call, `Exit { status: 0 }` unless changed with
/// [`Script::then`].
pub struct Script {
    steps: VecDeque<Syscall>,
    after: Syscall,
    transcript: Transcript,
}

impl Script {
    /// A script and the handle its completions are recorded into.
    pub fn new<I>(steps: I) -> (Script, Transcript)
    where
        I: IntoIterator<Item = Syscall>,
    {
        let transcript = Transcript::default();
        let script = Script {
            steps: steps.into_iter().collect(),
            after: Syscall::Exit { status: 0 },
            transcript: transcript.clone(),
        };
        (script, transcript)
    }

    /// Replaces the call repeated after the list runs out.
    pub fn then(mut self, call: Syscall) -> Script {
        self.after = call;
        self
    }

    fn next(&mut self) -> Syscall {
        self.steps
            .pop_front()
            .unwrap_or_else(|| self.after.clone())
    }
}

impl Program for Script {
    fn start(&mut self) -> Syscall {
        self.next()
    }

    fn resume(&mut self, completion: Completion) -> Syscall {
        self.transcript.lock().push(completion);
        self.next()
    }
}

/// A server that receives and discards messages forever.
pub struct Sink;

impl Program for Sink {
    fn start(&mut self) -> Syscall {
        Syscall::Recv { from: None }
    }

    fn resume(&mut self, _: Completion) -> Syscall {
        Syscall::Recv { from: None }
    }
}

/// Host machine type used by tests.
pub type TestMachine = Machine<MockClint, MemMailbox>;

/// Boots a kernel with placeholder file and directory services and `shell`
/// at the shell's pid.
pub fn machine(registry: ProgramRegistry, shell: Box<dyn Program>) -> TestMachine {
    let config = KernelConfig::default().with_quantum(TEST_QUANTUM);
    let clint = MockClint::new(config.quantum_ticks);
    let mut kernel = Kernel::new(clint, MemMailbox::new(), registry, config);
    kernel.boot(vec![Box::new(Sink) as Box<dyn Program>, Box::new(Sink), shell]);
    Machine::new(kernel)
}
