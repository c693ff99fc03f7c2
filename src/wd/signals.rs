//! Pulse/stop signal handling, installed identically on both the guarded
//! program's side and the `wd-exec` side of the mutual-monitoring loop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::{WdError, WdResult};

/// Missed-pulse counter. Incremented once per scheduler tick by the pulse
/// task, reset to zero whenever a SIGUSR1 arrives from the peer.
pub static MISSED_PULSES: AtomicU32 = AtomicU32::new(0);

/// Set by a SIGUSR2 delivery; the pulse task checks this every tick and
/// destroys its scheduler once it is set.
pub static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_pulse(_signum: libc::c_int) {
    MISSED_PULSES.store(0, Ordering::SeqCst);
}

extern "C" fn on_stop(_signum: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Install SIGUSR1 -> reset missed-pulse counter, SIGUSR2 -> request stop.
///
/// `sigaction` is process-wide, so this only needs calling once even though
/// the user-side pulse loop runs on its own thread.
pub fn install_handlers() -> WdResult<()> {
    install_one(libc::SIGUSR1, on_pulse)?;
    install_one(libc::SIGUSR2, on_stop)?;
    Ok(())
}

fn install_one(signum: libc::c_int, handler: extern "C" fn(libc::c_int)) -> WdResult<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;

        if libc::sigaction(signum, &action, std::ptr::null_mut()) == -1 {
            return Err(WdError::SignalInstall(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}

/// Reset both flags to their initial state. Called at the start of a
/// recovery cycle and by tests that exercise several scenarios in one
/// process.
pub fn reset() {
    MISSED_PULSES.store(0, Ordering::SeqCst);
    STOP_REQUESTED.store(false, Ordering::SeqCst);
}
