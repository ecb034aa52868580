//! The kernel: process table, scheduler, IPC and the trap dispatcher.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kivi_common::pid::WELL_KNOWN;
use kivi_common::{
    Completion, Mailbox, Message, Pid, ProcFlags, ProcStatus, SysError, Syscall, GPID_PROCESS,
};
use kivi_hal::{InterruptController, Timer};
use kivi_sdk::Program;
use log::{debug, info, warn};

use crate::config::KernelConfig;
use crate::error::{fatal, KernelError};
use crate::ipc::{Envelope, Ipc, RecvOutcome, SendOutcome};
use crate::process::ProcessTable;
use crate::sched::Scheduler;
use crate::service::{ProcessManager, ProgramRegistry, ServiceContext};
use crate::task::TaskSet;
use crate::trap::Interrupt;

/// All kernel state for one hart.
///
/// `C` is the interrupt hardware (timer plus software-interrupt bit) and `M`
/// the shared syscall area.
pub struct Kernel<C, M> {
    pub(crate) clint: C,
    pub(crate) mailbox: M,
    pub(crate) table: ProcessTable,
    pub(crate) sched: Scheduler,
    pub(crate) ipc: Ipc,
    pub(crate) tasks: TaskSet,
    pm: ProcessManager,
    config: KernelConfig,
}

impl<C, M> Kernel<C, M>
where
    C: Timer + InterruptController,
    M: Mailbox,
{
    /// Creates a kernel with an empty process table.
    pub fn new(clint: C, mailbox: M, registry: ProgramRegistry, config: KernelConfig) -> Self {
        Kernel {
            clint,
            mailbox,
            table: ProcessTable::new(),
            sched: Scheduler::new(),
            ipc: Ipc::new(),
            tasks: TaskSet::new(),
            pm: ProcessManager::new(registry, config.home.clone()),
            config,
        }
    }

    /// Arms the timer and starts the system services.
    ///
    /// The process service is created first, then `services` in order. Each
    /// must land on the pid [`WELL_KNOWN`] configures for it.
    pub fn boot(&mut self, services: Vec<Box<dyn Program>>) {
        self.clint.reset();

        let pm = self.table.alloc();
        check_well_known(0, pm);
        if let Some(slot) = self.table.get_mut(pm) {
            slot.flags = ProcFlags::SYSTEM;
        }
        self.service_recv();
        info!("boot: process service at pid {}", pm);

        for (i, program) in services.into_iter().enumerate() {
            let pid = self.launch(program, ProcFlags::SYSTEM);
            check_well_known(i + 1, pid);
            info!("boot: started service pid {}", pid);
        }
    }

    /// Creates a parentless process running `program`.
    pub fn launch(&mut self, program: Box<dyn Program>, flags: ProcFlags) -> Pid {
        self.context().create(program, flags, None)
    }

    /// Trap entry for interrupt `id`. Unknown ids are fatal.
    pub fn handle_interrupt(&mut self, id: u32) {
        match Interrupt::classify(id) {
            Ok(Interrupt::Timer) => self.on_timer(),
            Ok(Interrupt::Software) => self.on_syscall(),
            Err(err) => fatal(err),
        }
    }

    fn on_timer(&mut self) {
        self.clint.reset();
        self.sched.preempt(&mut self.table);
    }

    fn on_syscall(&mut self) {
        let area = self.mailbox.area().take();
        self.clint.clear_software();
        let pid = self
            .sched
            .current()
            .unwrap_or_else(|| fatal(KernelError::NoRunningProcess));

        match Syscall::decode(&area) {
            Ok(Some(call)) => self.dispatch(pid, call),
            Ok(None) => {
                warn!("trap: doorbell from {} with no request", pid);
                self.complete(pid, Completion::Failed(SysError::BadSyscall));
            }
            Err(err) => {
                warn!("trap: bad request from {}: {}", pid, err);
                self.complete(pid, Completion::Failed(err));
            }
        }
        self.sched.settle(&self.table);
    }

    fn dispatch(&mut self, pid: Pid, call: Syscall) {
        debug!("trap: {} {:?}", pid, call.kind());
        match call {
            Syscall::Send { dst, msg } => self.send(pid, dst, msg),
            Syscall::Spawn { argv } => self.send(pid, GPID_PROCESS, Message::Spawn(argv)),
            Syscall::KillAll => self.send(pid, GPID_PROCESS, Message::KillAll),
            Syscall::Recv { from } => {
                match self.ipc.recv(&mut self.table, &mut self.sched, pid, from) {
                    Ok(RecvOutcome::Received(env)) => self.complete(
                        pid,
                        Completion::Received {
                            from: env.from,
                            msg: env.msg,
                        },
                    ),
                    Ok(RecvOutcome::Blocked) => {}
                    Err(err) => self.complete(pid, Completion::Failed(err)),
                }
            }
            Syscall::Exit { status } => self.exit(pid, status),
            Syscall::Yield => {
                self.complete(pid, Completion::Done);
                self.sched.preempt(&mut self.table);
            }
        }
    }

    fn send(&mut self, pid: Pid, dst: Pid, msg: Message) {
        match self.ipc.send(&mut self.table, &mut self.sched, pid, dst, msg) {
            Ok(SendOutcome::Delivered) => self.complete(pid, Completion::Done),
            Ok(SendOutcome::Blocked) => {}
            Err(err) => self.complete(pid, Completion::Failed(err)),
        }
    }

    /// Hands an exit to the process service; the caller never runs again.
    fn exit(&mut self, pid: Pid, status: i32) {
        if let Some(slot) = self.table.get_mut(pid) {
            slot.flags |= ProcFlags::EXITING;
        }
        let msg = Message::Exit { status };
        match self.ipc.send(&mut self.table, &mut self.sched, pid, GPID_PROCESS, msg) {
            // Off the CPU, and the scheduler skips it until it is destroyed.
            Ok(SendOutcome::Delivered) => {
                self.table.set_runnable(pid);
            }
            Ok(SendOutcome::Blocked) => {}
            Err(err) => {
                warn!("trap: exit of {} not delivered: {}", pid, err);
                self.context().destroy(pid);
            }
        }
    }

    /// Picks the process to run next.
    pub fn schedule(&mut self) -> Option<Pid> {
        self.sched.schedule(&mut self.table)
    }

    /// One slice of the process service: handle the request it received,
    /// then wait for the next one.
    pub(crate) fn run_service(&mut self) {
        if let Some(Completion::Received { from, msg }) = self.take_completion(GPID_PROCESS) {
            let env = Envelope {
                from,
                to: GPID_PROCESS,
                msg,
            };
            let mut ctx = ServiceContext {
                table: &mut self.table,
                sched: &mut self.sched,
                ipc: &mut self.ipc,
                tasks: &mut self.tasks,
            };
            self.pm.serve(&mut ctx, env);
        }
        self.service_recv();
        self.sched.settle(&self.table);
    }

    fn service_recv(&mut self) {
        match self
            .ipc
            .recv(&mut self.table, &mut self.sched, GPID_PROCESS, None)
        {
            Ok(RecvOutcome::Received(env)) => self.complete(
                GPID_PROCESS,
                Completion::Received {
                    from: env.from,
                    msg: env.msg,
                },
            ),
            Ok(RecvOutcome::Blocked) => {}
            Err(err) => warn!("proc: service cannot receive: {}", err),
        }
    }

    fn context(&mut self) -> ServiceContext<'_> {
        ServiceContext {
            table: &mut self.table,
            sched: &mut self.sched,
            ipc: &mut self.ipc,
            tasks: &mut self.tasks,
        }
    }

    pub(crate) fn complete(&mut self, pid: Pid, completion: Completion) {
        if let Some(slot) = self.table.get_mut(pid) {
            slot.ipc.completion = Some(completion);
        }
    }

    pub(crate) fn take_completion(&mut self, pid: Pid) -> Option<Completion> {
        self.table
            .get_mut(pid)
            .and_then(|slot| slot.ipc.completion.take())
    }

    /// The running process.
    pub fn current(&self) -> Option<Pid> {
        self.sched.current()
    }

    /// Status of `pid`, if it exists.
    pub fn status(&self, pid: Pid) -> Option<ProcStatus> {
        self.table.status(pid)
    }

    /// The process table.
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// Pending posted messages.
    pub fn ipc(&self) -> &Ipc {
        &self.ipc
    }

    /// The process-management service.
    pub fn process_manager(&self) -> &ProcessManager {
        &self.pm
    }

    /// The interrupt hardware.
    pub fn clint(&self) -> &C {
        &self.clint
    }

    /// Mutable access to the interrupt hardware.
    pub fn clint_mut(&mut self) -> &mut C {
        &mut self.clint
    }

    /// Mutable access to the syscall area.
    pub fn mailbox_mut(&mut self) -> &mut M {
        &mut self.mailbox
    }

    /// Boot configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

fn check_well_known(index: usize, got: Pid) {
    if let Some((name, expected)) = WELL_KNOWN.get(index) {
        if *expected != got {
            warn!("boot: {} service misplaced", name);
            fatal(KernelError::WellKnownMismatch {
                expected: *expected,
                got,
            });
        }
    }
}
