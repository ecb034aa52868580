//! The shell: runs a list of command lines through the process service.
//!
//! Each line becomes one request. The shell then waits for as many replies
//! as the request calls for (see [`Request::expected_replies`]) before
//! moving on, and exits once the lines run out.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kivi_sdk::shell::Request;
use kivi_sdk::{request, Completion, Message, Program, SysError, Syscall};
use log::{info, warn};
use spin::Mutex;

/// Something the shell observed while running a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// A reply from the process service.
    Reply(Message),
    /// The line could not be parsed or sent.
    Rejected(SysError),
}

/// Shared record of everything the shell observed.
pub type History = Arc<Mutex<Vec<ShellEvent>>>;

#[derive(Clone, Copy)]
enum State {
    /// Request sent, waiting for the send to complete.
    Sending { replies: usize },
    /// Waiting for `left` more replies.
    Awaiting { left: usize },
    Done,
}

/// The shell program.
pub struct Shell {
    lines: VecDeque<String>,
    state: State,
    history: History,
}

impl Shell {
    /// A shell that will run `lines` in order.
    pub fn new<I, S>(lines: I) -> (Shell, History)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let history = History::default();
        let shell = Shell {
            lines: lines.into_iter().map(Into::into).collect(),
            state: State::Done,
            history: history.clone(),
        };
        (shell, history)
    }

    fn record(&self, event: ShellEvent) {
        self.history.lock().push(event);
    }

    fn next_command(&mut self) -> Syscall {
        while let Some(line) = self.lines.pop_front() {
            match Request::parse(&line) {
                Ok(None) => continue,
                Ok(Some(req)) => {
                    info!("shell: {}", line.trim());
                    self.state = State::Sending {
                        replies: req.expected_replies(),
                    };
                    return req.syscall();
                }
                Err(err) => {
                    warn!("shell: {}: {}", line.trim(), err);
                    self.record(ShellEvent::Rejected(err));
                }
            }
        }
        self.state = State::Done;
        request::exit(0)
    }

    fn on_reply(&mut self, left: usize, msg: Message) -> Syscall {
        let rejected = msg == Message::CmdError;
        if rejected {
            warn!("shell: command causes an error");
        }
        self.record(ShellEvent::Reply(msg));
        if rejected || left <= 1 {
            return self.next_command();
        }
        self.state = State::Awaiting { left: left - 1 };
        request::await_reply()
    }
}

impl Program for Shell {
    fn start(&mut self) -> Syscall {
        self.next_command()
    }

    fn resume(&mut self, completion: Completion) -> Syscall {
        match (self.state, completion) {
            (_, Completion::Failed(err)) => {
                warn!("shell: request failed: {}", err);
                self.record(ShellEvent::Rejected(err));
                self.next_command()
            }
            (State::Sending { replies }, _) => {
                self.state = State::Awaiting { left: replies };
                request::await_reply()
            }
            (State::Awaiting { left }, Completion::Received { msg, .. }) => self.on_reply(left, msg),
            (State::Awaiting { .. }, Completion::Done) => request::await_reply(),
            (State::Done, _) => request::exit(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kivi_sdk::Pid;

    const PM: Pid = kivi_sdk::GPID_PROCESS;

    fn reply(msg: Message) -> Completion {
        Completion::Received { from: PM, msg }
    }

    #[test]
    fn foreground_waits_for_two_replies() {
        let (mut shell, history) = Shell::new(["echo hi"]);
        assert!(matches!(shell.start(), Syscall::Send { .. }));
        assert_eq!(shell.resume(Completion::Done), request::await_reply());
        assert_eq!(shell.resume(reply(Message::CmdOk)), request::await_reply());
        let exited = Message::Exited {
            pid: Pid::from_raw(5).unwrap(),
            status: 0,
        };
        assert_eq!(shell.resume(reply(exited.clone())), request::exit(0));
        assert_eq!(
            *history.lock(),
            [ShellEvent::Reply(Message::CmdOk), ShellEvent::Reply(exited)]
        );
    }

    #[test]
    fn error_reply_ends_the_command() {
        let (mut shell, history) = Shell::new(["frobnicate", "cd"]);
        shell.start();
        shell.resume(Completion::Done);
        // Moves straight on to `cd`.
        assert!(matches!(shell.resume(reply(Message::CmdError)), Syscall::Send { .. }));
        assert_eq!(*history.lock(), [ShellEvent::Reply(Message::CmdError)]);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let line = ["x"; 9].join(" ");
        let (mut shell, history) = Shell::new([line.as_str(), "", "  "]);
        assert_eq!(shell.start(), request::exit(0));
        assert_eq!(*history.lock(), [ShellEvent::Rejected(SysError::TooManyArgs)]);
    }
}
