//! Entering the kernel through the syscall area.

use kivi_common::{Completion, Mailbox, SysError, Syscall};
use kivi_hal::InterruptController;
use log::trace;

/// Writes `call` into the syscall area and raises the software interrupt.
///
/// The write and the doorbell happen back to back; nothing else runs in the
/// caller between them. If the request does not fit in the area nothing is
/// written and the doorbell is not rung.
pub fn invoke<M, I>(mailbox: &mut M, intc: &mut I, call: &Syscall) -> Result<(), SysError>
where
    M: Mailbox,
    I: InterruptController,
{
    if let Err(err) = call.encode(mailbox.area()) {
        trace!("sdk: {:?} not sent: {}", call.kind(), err);
        return Err(err);
    }
    trace!("sdk: {:?}", call.kind());
    intc.raise_software();
    Ok(())
}

/// Reads the completion the kernel left in the syscall area.
pub fn completion<M: Mailbox>(mailbox: &mut M) -> Completion {
    Completion::read(mailbox.area())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use kivi_common::syscall::SYSCALL_MSG_LEN;
    use kivi_common::{Message, SyscallArea, SyscallKind, GPID_PROCESS};

    struct Area(SyscallArea);

    impl Mailbox for Area {
        fn area(&mut self) -> &mut SyscallArea {
            &mut self.0
        }
    }

    #[derive(Default)]
    struct Doorbell(bool);

    impl InterruptController for Doorbell {
        fn raise_software(&mut self) {
            self.0 = true;
        }
        fn clear_software(&mut self) {
            self.0 = false;
        }
        fn software_pending(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn invoke_writes_then_rings() {
        let mut area = Area(SyscallArea::new());
        let mut bell = Doorbell::default();
        invoke(&mut area, &mut bell, &Syscall::KillAll).unwrap();
        assert!(bell.software_pending());
        assert_eq!(area.0.kind, SyscallKind::KillAll as u32);
    }

    #[test]
    fn oversized_request_does_not_ring() {
        let mut area = Area(SyscallArea::new());
        let mut bell = Doorbell::default();
        let call = Syscall::Send {
            dst: GPID_PROCESS,
            msg: Message::Data(vec![1; SYSCALL_MSG_LEN]),
        };
        assert_eq!(
            invoke(&mut area, &mut bell, &call),
            Err(SysError::PayloadTooLarge)
        );
        assert!(!bell.software_pending());
    }

    #[test]
    fn reads_back_completion() {
        let mut area = Area(SyscallArea::new());
        Completion::Failed(SysError::NoSuchProcess).write(&mut area.0);
        assert_eq!(
            completion(&mut area),
            Completion::Failed(SysError::NoSuchProcess)
        );
    }
}
