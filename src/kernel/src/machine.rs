//! Single-hart machine loop.
//!
//! Drives a [`Kernel`] the way the hardware would: the scheduled process
//! runs until it writes a request into the syscall area and rings the
//! doorbell, the pending software interrupt enters the trap handler, and the
//! timer interrupt is checked between slices. User programs are state
//! machines (see [`Program`](kivi_sdk::Program)), so a slice is one call into
//! the program.

use kivi_common::{Completion, Mailbox, Pid, GPID_PROCESS};
use kivi_hal::{InterruptController, Timer};
use kivi_sdk::trap;
use log::warn;

use crate::arch::riscv::{INTR_ID_SOFT, INTR_ID_TMR};
use crate::kernel::Kernel;

/// What one step of the machine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `Pid` ran for one slice.
    Ran(Pid),
    /// Nothing was runnable.
    Idle,
}

/// A kernel plus the loop that runs it.
pub struct Machine<C, M> {
    kernel: Kernel<C, M>,
}

impl<C, M> Machine<C, M>
where
    C: Timer + InterruptController,
    M: Mailbox,
{
    /// Wraps a booted kernel.
    pub fn new(kernel: Kernel<C, M>) -> Self {
        Machine { kernel }
    }

    /// The kernel being driven.
    pub fn kernel(&self) -> &Kernel<C, M> {
        &self.kernel
    }

    /// Mutable access to the kernel.
    pub fn kernel_mut(&mut self) -> &mut Kernel<C, M> {
        &mut self.kernel
    }

    /// Runs one slice, then takes the timer interrupt if it is due.
    pub fn step(&mut self) -> Step {
        let step = match self.kernel.schedule() {
            Some(pid) if pid == GPID_PROCESS => {
                self.kernel.run_service();
                Step::Ran(pid)
            }
            Some(pid) => {
                self.run_user(pid);
                Step::Ran(pid)
            }
            None => Step::Idle,
        };
        if self.kernel.clint.expired() {
            self.kernel.handle_interrupt(INTR_ID_TMR);
        }
        step
    }

    /// Steps until the machine goes idle or `max_steps` have run.
    ///
    /// Returns the number of slices that ran.
    pub fn run(&mut self, max_steps: usize) -> usize {
        for n in 0..max_steps {
            if self.step() == Step::Idle {
                return n;
            }
        }
        max_steps
    }

    /// Steps until `done` holds, giving up after `max_steps`.
    pub fn run_until<F>(&mut self, max_steps: usize, mut done: F) -> bool
    where
        F: FnMut(&Kernel<C, M>) -> bool,
    {
        for _ in 0..max_steps {
            if done(&self.kernel) {
                return true;
            }
            self.step();
        }
        done(&self.kernel)
    }

    fn run_user(&mut self, pid: Pid) {
        let kernel = &mut self.kernel;

        // Switching in: the result of the previous call goes into the area.
        let completion = kernel.take_completion(pid).unwrap_or(Completion::Done);
        completion.write(kernel.mailbox.area());

        let Some(task) = kernel.tasks.get_mut(pid) else {
            warn!("machine: pid {} has no program", pid);
            kernel.table.set_runnable(pid);
            kernel.sched.settle(&kernel.table);
            return;
        };
        let call = task.step(trap::completion(&mut kernel.mailbox));

        if let Err(err) = trap::invoke(&mut kernel.mailbox, &mut kernel.clint, &call) {
            warn!("machine: pid {} made an unencodable call: {}", pid, err);
            kernel.complete(pid, Completion::Failed(err));
            return;
        }
        if kernel.clint.software_pending() {
            kernel.handle_interrupt(INTR_ID_SOFT);
        }
    }
}
