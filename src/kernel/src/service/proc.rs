//! The process-management service.
//!
//! Runs at [`GPID_PROCESS`] and owns process creation and destruction:
//!
//! - `Spawn` acknowledges with `CmdOk` once the program exists, or
//!   `CmdError` if it cannot be started. A foreground program's parent later
//!   receives `Exited` when it finishes.
//! - `KillAll` destroys every process not flagged `SYSTEM` and acknowledges
//!   once. Parents of killed foreground programs receive `Exited` with
//!   [`KILLED_STATUS`].
//! - `Exit` is sent by the kernel on behalf of a process that exits. The same
//!   message from a process that did not make the exit call gets `CmdError`.
//!
//! Replies are posted, so the service never blocks on a slow requester.

use alloc::string::String;
use alloc::vec::Vec;

use kivi_common::{ArgList, Message, Pid, ProcFlags, SysError, GPID_PROCESS};
use log::{info, warn};

use super::{ProgramRegistry, ServiceContext};
use crate::ipc::Envelope;

/// Exit status reported for a program destroyed by kill-all.
pub const KILLED_STATUS: i32 = -1;

/// State of the process-management service.
pub struct ProcessManager {
    registry: ProgramRegistry,
    workdir: String,
    home: String,
}

impl ProcessManager {
    /// Creates the service with the programs it may spawn.
    pub fn new(registry: ProgramRegistry, home: String) -> Self {
        ProcessManager {
            registry,
            workdir: String::from("/"),
            home,
        }
    }

    /// The working directory maintained by the built-in `cd`.
    pub fn workdir(&self) -> &str {
        &self.workdir
    }

    /// Programs this service can start.
    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    /// Handles one request.
    pub fn serve(&mut self, ctx: &mut ServiceContext<'_>, env: Envelope) {
        let Envelope { from, msg, .. } = env;
        match msg {
            Message::Spawn(argv) => {
                let reply = match self.spawn(ctx, from, &argv) {
                    Ok(_) => Message::CmdOk,
                    Err(err) => {
                        warn!("proc: cannot start {}: {}", argv.program(), err);
                        Message::CmdError
                    }
                };
                ctx.reply(GPID_PROCESS, from, reply);
            }
            Message::KillAll => {
                self.kill_all(ctx);
                ctx.reply(GPID_PROCESS, from, Message::CmdOk);
            }
            Message::Exit { status } => {
                let exiting = ctx
                    .table()
                    .get(from)
                    .is_some_and(|p| p.flags().contains(ProcFlags::EXITING));
                if exiting {
                    self.exit(ctx, from, status);
                } else {
                    warn!("proc: exit sent by {} outside the exit call", from);
                    ctx.reply(GPID_PROCESS, from, Message::CmdError);
                }
            }
            other => {
                warn!("proc: ignoring {:?} from {}", other, from);
                ctx.reply(GPID_PROCESS, from, Message::CmdError);
            }
        }
    }

    /// Starts `argv` on behalf of `parent`.
    ///
    /// Built-ins run here and yield `None`.
    fn spawn(
        &mut self,
        ctx: &mut ServiceContext<'_>,
        parent: Pid,
        argv: &ArgList,
    ) -> Result<Option<Pid>, SysError> {
        if argv.program() == "cd" {
            self.workdir = resolve_dir(&self.workdir, &self.home, argv.args().get(1));
            info!("proc: working directory is now {}", self.workdir);
            return Ok(None);
        }

        let factory = self
            .registry
            .lookup(argv.program())
            .ok_or(SysError::UnknownProgram)?;
        let program = factory(argv)?;

        let mut flags = ProcFlags::empty();
        if argv.is_background() {
            flags |= ProcFlags::BACKGROUND;
        }
        let pid = ctx.create(program, flags, Some(parent));
        info!("proc: started {} as pid {} for {}", argv.program(), pid, parent);
        Ok(Some(pid))
    }

    fn kill_all(&mut self, ctx: &mut ServiceContext<'_>) {
        let victims: Vec<(Pid, Option<Pid>)> = ctx
            .table()
            .iter()
            .filter(|p| !p.is_system())
            .filter_map(|p| {
                let parent = p.parent().filter(|_| !p.flags().contains(ProcFlags::BACKGROUND));
                p.pid().map(|pid| (pid, parent))
            })
            .collect();
        for &(pid, _) in &victims {
            ctx.destroy(pid);
        }
        // Parents still waiting on a foreground child get its completion.
        for &(pid, parent) in &victims {
            if let Some(parent) = parent.filter(|p| ctx.table().contains(*p)) {
                let msg = Message::Exited {
                    pid,
                    status: KILLED_STATUS,
                };
                ctx.reply(GPID_PROCESS, parent, msg);
            }
        }
        info!("proc: killed {} processes", victims.len());
    }

    fn exit(&mut self, ctx: &mut ServiceContext<'_>, pid: Pid, status: i32) {
        let Some(proc) = ctx.table().get(pid) else {
            warn!("proc: exit from unknown pid {}", pid);
            return;
        };
        let parent = proc.parent();
        let background = proc.flags().contains(ProcFlags::BACKGROUND);

        ctx.destroy(pid);
        info!("proc: pid {} exited with status {}", pid, status);

        // A backgrounded job's parent stopped waiting at the acknowledgement.
        if let (Some(parent), false) = (parent, background) {
            ctx.reply(GPID_PROCESS, parent, Message::Exited { pid, status });
        }
    }
}

/// Resolves the target of `cd`: no argument means home, `..` climbs, and
/// relative paths are taken from `cwd`.
fn resolve_dir(cwd: &str, home: &str, target: Option<&String>) -> String {
    let Some(target) = target else {
        return String::from(home);
    };
    let mut parts: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            seg => parts.push(seg),
        }
    }
    let mut dir = String::new();
    for part in parts {
        dir.push('/');
        dir.push_str(part);
    }
    if dir.is_empty() {
        dir.push('/');
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    use crate::ipc::Ipc;
    use crate::process::ProcessTable;
    use crate::sched::Scheduler;
    use crate::task::TaskSet;

    struct World {
        table: ProcessTable,
        sched: Scheduler,
        ipc: Ipc,
        tasks: TaskSet,
        pm: ProcessManager,
    }

    impl World {
        fn new() -> Self {
            let registry: ProgramRegistry = kivi_coreutils::PROGRAMS.into_iter().collect();
            let mut w = World {
                table: ProcessTable::new(),
                sched: Scheduler::new(),
                ipc: Ipc::new(),
                tasks: TaskSet::new(),
                pm: ProcessManager::new(registry, String::from("/home")),
            };
            let pm = w.table.alloc();
            assert_eq!(pm, GPID_PROCESS);
            w
        }

        fn system(&mut self) -> Pid {
            let pid = self.table.alloc();
            if let Some(p) = self.table.get_mut(pid) {
                p.flags = ProcFlags::SYSTEM;
            }
            self.sched.make_ready(&mut self.table, pid);
            pid
        }

        fn spawn(&mut self, parent: Pid, line: &[&str]) -> Result<Option<Pid>, SysError> {
            let argv = ArgList::new(line.iter().copied()).unwrap();
            let mut ctx = ServiceContext {
                table: &mut self.table,
                sched: &mut self.sched,
                ipc: &mut self.ipc,
                tasks: &mut self.tasks,
            };
            self.pm.spawn(&mut ctx, parent, &argv)
        }

        fn serve(&mut self, from: Pid, msg: Message) {
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

        fn replies(&self, to: Pid) -> Vec<Message> {
            self.ipc
                .posted()
                .filter(|e| e.to == to)
                .map(|e| e.msg.clone())
                .collect()
        }
    }

    #[test]
    fn spawn_failures_carry_a_reason() {
        let mut w = World::new();
        let shell = w.system();
        assert_eq!(w.spawn(shell, &["nope"]), Err(SysError::UnknownProgram));
        assert_eq!(w.spawn(shell, &["sleep", "abc"]), Err(SysError::InvalidArgument));
        assert_eq!(w.spawn(shell, &["cd", "/tmp"]), Ok(None));
        assert_eq!(w.pm.workdir(), "/tmp");
        assert_eq!(w.table.len(), 2);

        w.serve(shell, Message::Spawn(ArgList::new(["nope"]).unwrap()));
        assert_eq!(w.replies(shell), vec![Message::CmdError]);
    }

    #[test]
    fn kill_all_completes_foreground_children() {
        let mut w = World::new();
        let shell = w.system();
        let fg = w.spawn(shell, &["sleep", "100"]).unwrap().unwrap();
        let bg = w.spawn(shell, &["sleep", "100", "&"]).unwrap().unwrap();

        w.serve(shell, Message::KillAll);

        assert!(!w.table.contains(fg));
        assert!(!w.table.contains(bg));
        assert!(w.table.contains(shell));
        assert_eq!(
            w.replies(shell),
            vec![
                Message::Exited {
                    pid: fg,
                    status: KILLED_STATUS
                },
                Message::CmdOk
            ]
        );
    }

    #[test]
    fn kill_all_skips_parents_it_killed() {
        let mut w = World::new();
        let shell = w.system();
        let outer = w.spawn(shell, &["sleep", "100", "&"]).unwrap().unwrap();
        let inner = w.spawn(outer, &["sleep", "100"]).unwrap().unwrap();

        w.serve(shell, Message::KillAll);

        assert!(!w.table.contains(inner));
        assert!(w.replies(outer).is_empty());
        assert_eq!(w.replies(shell), vec![Message::CmdOk]);
    }

    #[test]
    fn exit_needs_the_exit_call() {
        let mut w = World::new();
        let shell = w.system();
        let child = w.spawn(shell, &["sleep", "100"]).unwrap().unwrap();

        w.serve(child, Message::Exit { status: 0 });
        assert!(w.table.contains(child));
        assert_eq!(w.replies(child), vec![Message::CmdError]);
        assert!(w.replies(shell).is_empty());

        if let Some(p) = w.table.get_mut(child) {
            p.flags |= ProcFlags::EXITING;
        }
        w.serve(child, Message::Exit { status: 3 });
        assert!(!w.table.contains(child));
        assert_eq!(
            w.replies(shell),
            vec![Message::Exited {
                pid: child,
                status: 3
            }]
        );
    }

    fn cd(cwd: &str, target: Option<&str>) -> String {
        let target = target.map(|t| t.to_string());
        resolve_dir(cwd, "/home", target.as_ref())
    }

    #[test]
    fn cd_paths() {
        assert_eq!(cd("/", None), "/home");
        assert_eq!(cd("/", Some("usr/bin")), "/usr/bin");
        assert_eq!(cd("/usr/bin", Some("..")), "/usr");
        assert_eq!(cd("/usr", Some("/etc/./x/..")), "/etc");
        assert_eq!(cd("/usr", Some("../../..")), "/");
    }
}
