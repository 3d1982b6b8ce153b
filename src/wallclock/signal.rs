//! Installs and tears down the async-signal-safe handler that runs on the
//! sampling signal.
//!
//! The handler cannot be passed an argument, so it locates the
//! [`HandshakeSlot`] and the runtime accessor through a single process-wide
//! static. The static is populated in [`install`] (called from
//! [`super::Engine::start`]) and cleared in [`teardown`] (called from
//! `stop`), so it is only ever non-null between a matched start/stop pair --
//! matching invariant 1's requirement that at most one handshake exists at
//! a time.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use super::handshake::{CapturedContext, HandshakeSlot};
use super::traits::{Os, RuntimeAccessor};

struct SignalContext {
    slot: Arc<HandshakeSlot>,
    runtime: Arc<dyn RuntimeAccessor>,
}

static GLOBAL: AtomicPtr<SignalContext> = AtomicPtr::new(ptr::null_mut());

/// Returned by [`install`] when a previous installation is still active,
/// i.e. `Engine::start` was called again before a matching `stop`.
pub struct AlreadyInstalled;

/// Installs the sampling signal handler and publishes the slot/runtime
/// pair the handler will use. Must be paired with exactly one later call to
/// [`teardown`]. Fails with [`AlreadyInstalled`] instead of clobbering a
/// still-active installation.
pub fn install(
    os: &dyn Os,
    signo: i32,
    slot: Arc<HandshakeSlot>,
    runtime: Arc<dyn RuntimeAccessor>,
) -> Result<(), AlreadyInstalled> {
    let ctx = Box::into_raw(Box::new(SignalContext { slot, runtime }));

    if GLOBAL
        .compare_exchange(ptr::null_mut(), ctx, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        // another installation is already active; drop the context we
        // just allocated instead of leaking the raw pointer.
        unsafe {
            drop(Box::from_raw(ctx));
        }
        return Err(AlreadyInstalled);
    }

    unsafe {
        os.install_signal_handler(signo, sampling_signal_handler);
    }

    Ok(())
}

/// Installs a no-op handler for the wakeup signal, so that sending it to
/// the timer thread interrupts its blocking sleep (`EINTR`) without the
/// default disposition terminating the process.
pub fn install_wakeup_handler(os: &dyn Os, signo: i32) {
    unsafe {
        os.install_signal_handler(signo, wakeup_signal_handler);
    }
}

extern "C" fn wakeup_signal_handler(
    _signo: libc::c_int,
    _siginfo: *mut libc::siginfo_t,
    _ucontext: *mut libc::c_void,
) {
}

/// Clears the global static and drops the boxed context. Safe to call only
/// after the timer thread has been joined, so no signal can arrive and read
/// a dangling pointer.
pub fn teardown() {
    let prev = GLOBAL.swap(ptr::null_mut(), Ordering::SeqCst);
    if !prev.is_null() {
        unsafe {
            drop(Box::from_raw(prev));
        }
    }
}

extern "C" fn sampling_signal_handler(
    _signo: libc::c_int,
    _siginfo: *mut libc::siginfo_t,
    ucontext: *mut libc::c_void,
) {
    let ptr = GLOBAL.load(Ordering::SeqCst);
    if ptr.is_null() {
        return;
    }

    // SAFETY: non-null only between `install` and `teardown`, and `teardown`
    // is only called after the timer thread (the only thread that sends
    // this signal) has been joined.
    let ctx = unsafe { &*ptr };

    let self_tid = unsafe { libc::syscall(libc::SYS_gettid) as i32 };

    unsafe {
        ctx.slot.handle_signal(self_tid, || {
            // the runtime accessor must be reentrant and allocation-free.
            // `handle_signal` fences immediately after this call returns;
            // that fence is load-bearing (omitting it has been observed to
            // cause problems, root cause not re-derived here) and must stay
            // paired with this accessor call.
            let runtime_env = ctx.runtime.current_runtime_env();
            CapturedContext {
                machine_context: ucontext,
                runtime_env,
            }
        });
    }
}
