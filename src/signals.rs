//! Interrupt handling for a clean shutdown
//!
//! SIGINT and SIGTERM set a process-wide flag that the capture loop polls
//! between reads, so the current session file is flushed and closed before
//! the process exits.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_: libc::c_int) {
    // Only async-signal-safe work here
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers and return the flag they set
#[cfg(unix)]
pub fn install() -> io::Result<&'static AtomicBool> {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: `action` is fully initialised before use and the handler
        // only touches an atomic.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);

            if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }

    Ok(&INTERRUPTED)
}

/// No signal support; the flag is never set
#[cfg(not(unix))]
pub fn install() -> io::Result<&'static AtomicBool> {
    Ok(&INTERRUPTED)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_sigterm_sets_flag() {
        let flag = install().unwrap();
        assert!(!flag.load(Ordering::SeqCst));

        unsafe {
            libc::raise(libc::SIGTERM);
        }

        assert!(flag.load(Ordering::SeqCst));
        flag.store(false, Ordering::SeqCst);
    }
}
