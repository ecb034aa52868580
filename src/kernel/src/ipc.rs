//! Synchronous message passing.
//!
//! `send` and `recv` rendezvous: a sender whose destination is not waiting
//! parks in `WaitToSend` with its envelope attached to its own process slot,
//! and a receiver with nothing to take parks in `WaitToRecv` with its source
//! filter. Whichever side arrives second completes both.
//!
//! The process service answers requests with [`Ipc::post`] instead, which
//! never blocks; posted envelopes wait in a kernel queue until the
//! addressee receives. Between any pair of processes messages are received
//! in the order they were sent.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use kivi_common::{Completion, Message, Pid, ProcStatus, SysError};
use log::{debug, trace, warn};

use crate::process::ProcessTable;
use crate::sched::Scheduler;

/// A message in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sending process.
    pub from: Pid,
    /// Destination process.
    pub to: Pid,
    /// Payload.
    pub msg: Message,
}

/// Per-process rendezvous state, kept in the process slot.
#[derive(Debug, Default)]
pub struct IpcState {
    /// Envelope held while blocked in `WaitToSend`.
    pub(crate) outgoing: Option<Envelope>,
    /// Source filter while blocked in `WaitToRecv`; `None` accepts anyone.
    pub(crate) filter: Option<Pid>,
    /// Result of the last system call, handed over on the next resume.
    pub(crate) completion: Option<Completion>,
    /// Order in which this process started waiting to send.
    pub(crate) since: u64,
}

/// What became of a `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The destination was waiting and now has the message.
    Delivered,
    /// The caller is parked until the destination receives.
    Blocked,
}

/// What became of a `recv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvOutcome {
    /// A matching message was available.
    Received(Envelope),
    /// The caller is parked until a matching message is sent.
    Blocked,
}

/// Kernel-side IPC state shared by all processes.
#[derive(Debug, Default)]
pub struct Ipc {
    posted: VecDeque<Envelope>,
    seq: u64,
}

fn accepts(filter: Option<Pid>, from: Pid) -> bool {
    filter.map_or(true, |want| want == from)
}

/// Hands `env` to a receiver parked in `WaitToRecv` and wakes it.
fn deliver(table: &mut ProcessTable, sched: &mut Scheduler, env: Envelope) {
    let to = env.to;
    if let Some(receiver) = table.get_mut(to) {
        trace!("ipc: {} -> {} {:?}", env.from, to, env.msg);
        receiver.ipc.filter = None;
        receiver.ipc.completion = Some(Completion::Received {
            from: env.from,
            msg: env.msg,
        });
        sched.make_ready(table, to);
    }
}

fn waiting_for(table: &ProcessTable, to: Pid, from: Pid) -> bool {
    table.get(to).map_or(false, |p| {
        p.status() == ProcStatus::WaitToRecv && accepts(p.ipc.filter, from)
    })
}

impl Ipc {
    /// Creates empty IPC state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelopes posted but not yet received.
    pub fn posted(&self) -> impl Iterator<Item = &Envelope> {
        self.posted.iter()
    }

    /// Sends `msg` from `from` to `to`.
    ///
    /// Delivers immediately when `to` is waiting for a message from `from`
    /// (or from anyone); otherwise parks `from` in `WaitToSend`.
    pub fn send(
        &mut self,
        table: &mut ProcessTable,
        sched: &mut Scheduler,
        from: Pid,
        to: Pid,
        msg: Message,
    ) -> Result<SendOutcome, SysError> {
        if !table.contains(to) {
            return Err(SysError::NoSuchProcess);
        }
        let env = Envelope { from, to, msg };
        if waiting_for(table, to, from) {
            deliver(table, sched, env);
            return Ok(SendOutcome::Delivered);
        }

        self.seq += 1;
        let sender = table.get_mut(from).ok_or(SysError::NoSuchProcess)?;
        debug!("ipc: {} blocks sending to {}", from, to);
        sender.status = ProcStatus::WaitToSend;
        sender.ipc.outgoing = Some(env);
        sender.ipc.since = self.seq;
        Ok(SendOutcome::Blocked)
    }

    /// Receives a message for `me`, optionally only from `filter`.
    ///
    /// Posted envelopes are taken first, oldest first. Next comes the
    /// matching blocked sender that has waited longest; it is released with
    /// a `Done` completion. With neither, `me` parks in `WaitToRecv`.
    ///
    /// Filtering on a pid that no longer exists fails with `NoSuchProcess`
    /// once nothing it posted is left.
    pub fn recv(
        &mut self,
        table: &mut ProcessTable,
        sched: &mut Scheduler,
        me: Pid,
        filter: Option<Pid>,
    ) -> Result<RecvOutcome, SysError> {
        if !table.contains(me) {
            return Err(SysError::NoSuchProcess);
        }

        let posted = self
            .posted
            .iter()
            .position(|e| e.to == me && accepts(filter, e.from));
        if let Some(env) = posted.and_then(|i| self.posted.remove(i)) {
            return Ok(RecvOutcome::Received(env));
        }
        if let Some(src) = filter {
            if !table.contains(src) {
                return Err(SysError::NoSuchProcess);
            }
        }

        let sender = table
            .iter()
            .filter(|p| p.status() == ProcStatus::WaitToSend)
            .filter(|p| {
                p.ipc
                    .outgoing
                    .as_ref()
                    .map_or(false, |e| e.to == me && accepts(filter, e.from))
            })
            .min_by_key(|p| p.ipc.since)
            .and_then(|p| p.pid());
        if let Some(sender) = sender {
            let env = table.get_mut(sender).and_then(|p| {
                p.ipc.completion = Some(Completion::Done);
                p.ipc.outgoing.take()
            });
            sched.make_ready(table, sender);
            if let Some(env) = env {
                trace!("ipc: {} -> {} {:?}", env.from, env.to, env.msg);
                return Ok(RecvOutcome::Received(env));
            }
        }

        if let Some(receiver) = table.get_mut(me) {
            receiver.status = ProcStatus::WaitToRecv;
            receiver.ipc.filter = filter;
        }
        Ok(RecvOutcome::Blocked)
    }

    /// Queues `msg` for `to` without blocking the sender.
    ///
    /// A receiver already waiting for it gets the message right away.
    /// Messages for processes that no longer exist are dropped.
    pub fn post(
        &mut self,
        table: &mut ProcessTable,
        sched: &mut Scheduler,
        from: Pid,
        to: Pid,
        msg: Message,
    ) {
        if !table.contains(to) {
            warn!("ipc: dropping {:?} for exited pid {}", msg, to);
            return;
        }
        let env = Envelope { from, to, msg };
        if waiting_for(table, to, from) {
            deliver(table, sched, env);
        } else {
            self.posted.push_back(env);
        }
    }

    /// Cleans up after `pid` has been removed from the table.
    ///
    /// Envelopes addressed to it are discarded. Processes blocked sending to
    /// it, or receiving only from it, are woken with `NoSuchProcess`.
    pub fn forget(&mut self, table: &mut ProcessTable, sched: &mut Scheduler, pid: Pid) {
        self.posted.retain(|e| e.to != pid);

        let stranded: Vec<Pid> = table
            .iter()
            .filter(|p| match p.status() {
                ProcStatus::WaitToSend => p.ipc.outgoing.as_ref().map_or(false, |e| e.to == pid),
                ProcStatus::WaitToRecv => p.ipc.filter == Some(pid),
                _ => false,
            })
            .filter_map(|p| p.pid())
            .collect();
        for waiter in stranded {
            debug!("ipc: waking {}, peer {} is gone", waiter, pid);
            if let Some(p) = table.get_mut(waiter) {
                p.ipc.outgoing = None;
                p.ipc.filter = None;
                p.ipc.completion = Some(Completion::Failed(SysError::NoSuchProcess));
            }
            sched.make_ready(table, waiter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    struct World {
        table: ProcessTable,
        sched: Scheduler,
        ipc: Ipc,
    }

    impl World {
        fn new() -> Self {
            World {
                table: ProcessTable::new(),
                sched: Scheduler::new(),
                ipc: Ipc::new(),
            }
        }

        fn spawn(&mut self) -> Pid {
            let pid = self.table.alloc();
            self.sched.make_ready(&mut self.table, pid);
            pid
        }

        fn send(&mut self, from: Pid, to: Pid, byte: u8) -> Result<SendOutcome, SysError> {
            self.ipc
                .send(&mut self.table, &mut self.sched, from, to, Message::Data(vec![byte]))
        }

        fn recv(&mut self, me: Pid, filter: Option<Pid>) -> RecvOutcome {
            self.ipc
                .recv(&mut self.table, &mut self.sched, me, filter)
                .unwrap()
        }

        fn completion(&mut self, pid: Pid) -> Option<Completion> {
            self.table.get_mut(pid).and_then(|p| p.ipc.completion.take())
        }
    }

    fn data(byte: u8) -> Message {
        Message::Data(vec![byte])
    }

    #[test]
    fn send_to_waiting_receiver_delivers() {
        let mut w = World::new();
        let (a, b) = (w.spawn(), w.spawn());
        assert_eq!(w.recv(b, None), RecvOutcome::Blocked);
        assert_eq!(w.table.status(b), Some(ProcStatus::WaitToRecv));

        assert_eq!(w.send(a, b, 7), Ok(SendOutcome::Delivered));
        assert_eq!(w.table.status(b), Some(ProcStatus::Runnable));
        assert_eq!(
            w.completion(b),
            Some(Completion::Received { from: a, msg: data(7) })
        );
    }

    #[test]
    fn send_blocks_until_received() {
        let mut w = World::new();
        let (a, b) = (w.spawn(), w.spawn());
        assert_eq!(w.send(a, b, 1), Ok(SendOutcome::Blocked));
        assert_eq!(w.table.status(a), Some(ProcStatus::WaitToSend));

        let got = w.recv(b, None);
        assert_eq!(
            got,
            RecvOutcome::Received(Envelope { from: a, to: b, msg: data(1) })
        );
        assert_eq!(w.table.status(a), Some(ProcStatus::Runnable));
        assert_eq!(w.completion(a), Some(Completion::Done));
    }

    #[test]
    fn filter_skips_other_senders() {
        let mut w = World::new();
        let (a, b, c) = (w.spawn(), w.spawn(), w.spawn());
        w.send(a, c, 1).unwrap();
        w.send(b, c, 2).unwrap();

        match w.recv(c, Some(b)) {
            RecvOutcome::Received(env) => assert_eq!(env.from, b),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(w.table.status(a), Some(ProcStatus::WaitToSend));

        // A filtered receiver ignores a sender it does not want.
        assert_eq!(w.recv(c, Some(b)), RecvOutcome::Blocked);
        assert_eq!(w.table.status(a), Some(ProcStatus::WaitToSend));
        assert_eq!(w.table.status(c), Some(ProcStatus::WaitToRecv));
    }

    #[test]
    fn longest_waiting_sender_goes_first() {
        let mut w = World::new();
        let (a, b, c) = (w.spawn(), w.spawn(), w.spawn());
        w.send(b, c, 2).unwrap();
        w.send(a, c, 1).unwrap();
        match w.recv(c, None) {
            RecvOutcome::Received(env) => assert_eq!(env.from, b),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_destination() {
        let mut w = World::new();
        let a = w.spawn();
        let ghost = Pid::from_raw(42).unwrap();
        assert_eq!(w.send(a, ghost, 0), Err(SysError::NoSuchProcess));
        assert_eq!(w.table.status(a), Some(ProcStatus::Runnable));
    }

    #[test]
    fn posted_messages_keep_order() {
        let mut w = World::new();
        let (svc, a) = (w.spawn(), w.spawn());
        w.ipc.post(&mut w.table, &mut w.sched, svc, a, data(1));
        w.ipc.post(&mut w.table, &mut w.sched, svc, a, data(2));
        assert_eq!(w.table.status(svc), Some(ProcStatus::Runnable));

        for byte in [1, 2] {
            match w.recv(a, Some(svc)) {
                RecvOutcome::Received(env) => assert_eq!(env.msg, data(byte)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(w.recv(a, Some(svc)), RecvOutcome::Blocked);
        w.ipc.post(&mut w.table, &mut w.sched, svc, a, data(3));
        assert_eq!(
            w.completion(a),
            Some(Completion::Received { from: svc, msg: data(3) })
        );
    }

    #[test]
    fn forget_releases_waiters() {
        let mut w = World::new();
        let (a, b, c, d) = (w.spawn(), w.spawn(), w.spawn(), w.spawn());
        w.send(a, b, 1).unwrap();
        assert_eq!(w.recv(c, Some(b)), RecvOutcome::Blocked);
        w.ipc.post(&mut w.table, &mut w.sched, d, b, data(9));

        w.table.free(b);
        w.ipc.forget(&mut w.table, &mut w.sched, b);

        assert_eq!(w.ipc.posted().count(), 0);
        for pid in [a, c] {
            assert_eq!(w.table.status(pid), Some(ProcStatus::Runnable));
            assert_eq!(
                w.completion(pid),
                Some(Completion::Failed(SysError::NoSuchProcess))
            );
        }
    }

    #[test]
    fn recv_from_dead_pid_fails() {
        let mut w = World::new();
        let (a, b) = (w.spawn(), w.spawn());
        w.table.free(a);
        w.ipc.forget(&mut w.table, &mut w.sched, a);

        assert_eq!(
            w.ipc.recv(&mut w.table, &mut w.sched, b, Some(a)),
            Err(SysError::NoSuchProcess)
        );
        assert_ne!(w.table.status(b), Some(ProcStatus::WaitToRecv));
        assert_eq!(w.recv(b, None), RecvOutcome::Blocked);
    }

    #[test]
    fn post_to_missing_process_is_dropped() {
        let mut w = World::new();
        let svc = w.spawn();
        let ghost = Pid::from_raw(30).unwrap();
        w.ipc.post(&mut w.table, &mut w.sched, svc, ghost, data(1));
        assert_eq!(w.ipc.posted().count(), 0);
    }
}
