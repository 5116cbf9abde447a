//! SIGINT handling.
//!
//! The interpreter publishes a pre-rendered copy of the history listing after
//! every change. The signal handler writes that copy straight to the output
//! descriptor with `write(2)` and raises a flag; it never allocates or locks.
//! When the output has no descriptor (in-memory sinks) the listing is printed
//! by the read-eval loop once it sees the flag.

use crate::history::History;
use anyhow::{Context, Result};
use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use std::os::fd::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, Ordering};

static PENDING: AtomicBool = AtomicBool::new(false);
static OUTPUT_FD: AtomicI32 = AtomicI32::new(-1);
static LISTING: AtomicPtr<Vec<u8>> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_interrupt(_signal: libc::c_int) {
    PENDING.store(true, Ordering::SeqCst);

    let fd = OUTPUT_FD.load(Ordering::SeqCst);
    let listing = LISTING.load(Ordering::SeqCst);
    if fd < 0 || listing.is_null() {
        return;
    }
    // SAFETY: `publish` swaps snapshots with SIGINT blocked, so the pointer
    // stays valid for the whole handler.
    let mut bytes = unsafe { (*listing).as_slice() };
    while !bytes.is_empty() {
        // SAFETY: plain write(2) on a borrowed buffer; async-signal-safe.
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n <= 0 {
            break;
        }
        bytes = &bytes[n as usize..];
    }
}

/// Handle to the process-wide interrupt state.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterruptHandler;

impl InterruptHandler {
    /// Install the SIGINT handler. Installing it again is harmless.
    ///
    /// The handler is installed without `SA_RESTART` so a blocking read on
    /// the input returns `EINTR` and the cycle ends empty.
    pub fn arm(&self) -> Result<()> {
        let action = SigAction::new(
            SigHandler::Handler(on_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only touches atomics and calls write(2).
        unsafe { signal::sigaction(Signal::SIGINT, &action) }
            .context("failed to install SIGINT handler")?;
        Ok(())
    }

    /// Descriptor the handler prints the listing to, or `None` to leave
    /// printing to the read-eval loop.
    pub fn set_output_fd(&self, fd: Option<RawFd>) {
        OUTPUT_FD.store(fd.unwrap_or(-1), Ordering::SeqCst);
    }

    /// Whether a delivered signal prints the listing by itself.
    pub fn prints_directly(&self) -> bool {
        OUTPUT_FD.load(Ordering::SeqCst) >= 0
    }

    /// Replace the listing the handler prints with the current state of `history`.
    pub fn publish(&self, history: &History) -> Result<()> {
        let mut rendered = vec![b'\n'];
        history.write_listing(&mut rendered)?;
        let fresh = Box::into_raw(Box::new(rendered));

        let mut blocked = SigSet::empty();
        blocked.add(Signal::SIGINT);
        let mut previous = SigSet::empty();
        signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&blocked), Some(&mut previous))
            .context("failed to block SIGINT")?;
        let stale = LISTING.swap(fresh, Ordering::SeqCst);
        if !stale.is_null() {
            // SAFETY: produced by Box::into_raw above and no longer reachable
            // from the handler while SIGINT is blocked on this thread.
            drop(unsafe { Box::from_raw(stale) });
        }
        signal::pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None)
            .context("failed to restore signal mask")?;
        Ok(())
    }

    /// Record an interrupt as if the signal had arrived.
    #[cfg(test)]
    pub(crate) fn raise(&self) {
        PENDING.store(true, Ordering::SeqCst);
    }

    /// Return whether an interrupt arrived since the last call, clearing it.
    pub fn take_pending(&self) -> bool {
        PENDING.swap(false, Ordering::SeqCst)
    }
}
