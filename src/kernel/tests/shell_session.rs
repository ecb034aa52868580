//! Whole-system runs: boot, a scripted shell, and the coreutils programs.

use kivi_common::{Message, Pid, ProcStatus, GPID_SHELL};
use kivi_coreutils::{Shell, ShellEvent, PROGRAMS};
use kivi_kernel::testutil::{machine, TestMachine};
use kivi_kernel::ProgramRegistry;

fn boot(lines: &[&str]) -> (TestMachine, kivi_coreutils::History) {
    let registry: ProgramRegistry = PROGRAMS.iter().copied().collect();
    let (shell, history) = Shell::new(lines.iter().copied());
    (machine(registry, Box::new(shell)), history)
}

fn pid(raw: u32) -> Pid {
    Pid::from_raw(raw).unwrap()
}

fn exited(raw: u32) -> ShellEvent {
    ShellEvent::Reply(Message::Exited {
        pid: pid(raw),
        status: 0,
    })
}

const OK: ShellEvent = ShellEvent::Reply(Message::CmdOk);

#[test]
fn cd_is_answered_once() {
    let (mut m, history) = boot(&["cd /usr/bin", "cd .."]);
    m.run(500);

    assert_eq!(*history.lock(), [OK, OK]);
    assert_eq!(m.kernel().process_manager().workdir(), "/usr");
    // The shell ran out of lines and exited; only services remain.
    assert_eq!(m.kernel().status(GPID_SHELL), None);
    assert_eq!(m.kernel().table().len(), 3);
}

#[test]
fn foreground_command_reports_completion() {
    let (mut m, history) = boot(&["echo hello"]);
    m.run(500);

    assert_eq!(*history.lock(), [OK, exited(5)]);
    assert_eq!(m.kernel().status(pid(5)), None);
}

#[test]
fn background_command_does_not_hold_the_shell() {
    let (mut m, history) = boot(&["sleep 50 &", "echo next"]);

    // The shell moves on to `echo` while `sleep` is still alive.
    let overlapped = m.run_until(500, |k| {
        history.lock().len() == 3 && k.status(pid(5)).is_some()
    });
    assert!(overlapped);
    assert_eq!(*history.lock(), [OK, OK, exited(6)]);

    m.run(1_000);
    assert_eq!(m.kernel().status(pid(5)), None);
    assert_eq!(history.lock().len(), 3);
}

#[test]
fn unknown_program_is_rejected() {
    let (mut m, history) = boot(&["bogus --flag", "sleep forever", "cd"]);
    m.run(500);

    assert_eq!(
        *history.lock(),
        [
            ShellEvent::Reply(Message::CmdError),
            ShellEvent::Reply(Message::CmdError),
            OK,
        ]
    );
    assert_eq!(m.kernel().process_manager().workdir(), "/home");
    assert_eq!(m.kernel().table().len(), 3);
}

#[test]
fn killall_spares_services() {
    let (mut m, history) = boot(&["sleep 10000 &", "sleep 10000 &", "killall"]);
    m.run(1_000);

    assert_eq!(*history.lock(), [OK, OK, OK]);
    for raw in [5, 6] {
        assert_eq!(m.kernel().status(pid(raw)), None);
    }
    assert!(m.kernel().table().iter().all(|p| p.is_system()));
    assert_eq!(m.kernel().status(pid(2)), Some(ProcStatus::WaitToRecv));
}

#[test]
fn never_more_than_one_running() {
    let (mut m, _history) = boot(&["sleep 5 &", "sleep 5 &", "echo a b c", "killall"]);
    for _ in 0..300 {
        m.step();
        let running = m
            .kernel()
            .table()
            .iter()
            .filter(|p| p.status() == ProcStatus::Running)
            .count();
        assert!(running <= 1);
    }
}
