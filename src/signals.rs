//! Termination signals
//!
//! SIGTERM and SIGHUP only set a flag. The event loop picks it up and closes
//! the window the same way a dismissed pop-up is closed, so the terminal is
//! restored and a running child still decides the exit status.

use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static CLOSE_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_close_signal(_: c_int) {
    CLOSE_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_close_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

/// Whether a close signal arrived since the last call
pub fn take_close_request() -> bool {
    CLOSE_REQUESTED.swap(false, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;

    #[test]
    fn test_hangup_requests_close() {
        install().unwrap();
        assert!(!take_close_request());

        raise(Signal::SIGHUP).unwrap();
        assert!(take_close_request());
        // consumed
        assert!(!take_close_request());
    }
}
