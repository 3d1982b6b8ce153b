//! The single-slot, lock-free rendezvous between the timer thread and one
//! signal handler invocation.
//!
//! There is exactly one [`HandshakeSlot`] per engine instance, and exactly
//! one handshake in flight at a time -- the timer thread is the sole
//! driver. The slot is never heap-owned per sample; `context_ptr` always
//! points at a `CapturedContext` living on the signal handler's own stack
//! frame, valid until `stack_walked` is observed true.

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, AtomicU64, Ordering};

use super::traits::RuntimeEnv;

/// No thread is currently armed.
pub const NO_TARGET: i32 = -1;

/// The machine context and runtime handle captured by the signal handler,
/// built on the handler's own stack and published into the slot for the
/// driver to read.
pub struct CapturedContext {
    /// The raw `ucontext_t` pointer delivered to the handler.
    pub machine_context: *mut libc::c_void,
    pub runtime_env: RuntimeEnv,
}

/// The process-wide rendezvous. All fields are sequentially-consistent
/// atomics; see the module docs and the design notes on why a generation
/// counter is needed alongside the boolean gates.
pub struct HandshakeSlot {
    target_tid: AtomicI32,
    context_ptr: AtomicPtr<CapturedContext>,
    handler_may_publish: AtomicBool,
    context_ready: AtomicBool,
    stack_walked: AtomicBool,
    generation: AtomicU64,
}

impl HandshakeSlot {
    pub const fn new() -> Self {
        Self {
            target_tid: AtomicI32::new(NO_TARGET),
            context_ptr: AtomicPtr::new(ptr::null_mut()),
            handler_may_publish: AtomicBool::new(false),
            context_ready: AtomicBool::new(false),
            stack_walked: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Driver-side: arms the slot for `tid`, bumping the generation and
    /// clearing the publish/ready/walked gates in an order that, combined
    /// with the trailing fence, guarantees a handler observing
    /// `handler_may_publish == true` also observes the fresh generation and
    /// the cleared `context_ready`/`stack_walked`.
    pub fn arm(&self, tid: i32) -> u64 {
        self.target_tid.store(tid, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.context_ptr.store(ptr::null_mut(), Ordering::SeqCst);
        self.context_ready.store(false, Ordering::SeqCst);
        self.stack_walked.store(false, Ordering::SeqCst);
        self.handler_may_publish.store(true, Ordering::SeqCst);
        std::sync::atomic::fence(Ordering::SeqCst);
        generation
    }

    /// Driver-side: the tid this arm phase targeted.
    pub fn target_tid(&self) -> i32 {
        self.target_tid.load(Ordering::SeqCst)
    }

    /// Driver-side: true once the handler has published a context.
    pub fn context_ready(&self) -> bool {
        self.context_ready.load(Ordering::SeqCst)
    }

    /// Driver-side: reads the published context pointer. Only meaningful
    /// once `context_ready()` is true.
    pub fn context_ptr(&self) -> *mut CapturedContext {
        self.context_ptr.load(Ordering::SeqCst)
    }

    /// Driver-side: releases the handler after the recorder call has
    /// returned.
    pub fn release(&self) {
        self.stack_walked.store(true, Ordering::SeqCst);
    }

    /// Driver-side: abandons the current arm after a handshake timeout.
    /// Resets the target to the sentinel, releases any handler that might
    /// still publish, and bumps the generation so a handler that wins the
    /// CAS after this point (or is already mid-publish) detects it no
    /// longer owns the slot instead of spinning forever. See the "late
    /// handler after driver timeout" design note.
    pub fn abandon(&self) {
        self.target_tid.store(NO_TARGET, Ordering::SeqCst);
        self.stack_walked.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Handler-side: the current generation, read before attempting the
    /// publish CAS.
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Handler-side: the current thread's tid as recorded by the arm
    /// phase.
    fn target_tid_relaxed(&self) -> i32 {
        self.target_tid.load(Ordering::SeqCst)
    }

    /// Handler-side entry point. `self_tid` is the tid of the thread the
    /// signal was delivered to (read via the OS facade, not atomics).
    /// `build` constructs the `CapturedContext` on the caller's stack; it
    /// is only invoked if this invocation wins the race.
    ///
    /// Returns without ever touching `build` if invariant 3 (mismatched
    /// target or a gate already claimed) applies. Otherwise busy-waits
    /// until released, as described in the module docs, and never returns
    /// early from that wait except when the generation has moved on.
    ///
    /// # Safety
    /// Must only be called from within the sampling signal handler, and
    /// `build` must be async-signal-safe.
    pub unsafe fn handle_signal(&self, self_tid: i32, build: impl FnOnce() -> CapturedContext) {
        if self_tid != self.target_tid_relaxed() {
            return;
        }

        let generation = self.generation();

        if self
            .handler_may_publish
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let mut local = build();
        let local_ptr: *mut CapturedContext = &mut local;

        std::sync::atomic::fence(Ordering::SeqCst);

        if self.generation() != generation {
            // the driver has already abandoned this arm; the slot is no
            // longer ours to publish into.
            return;
        }

        self.context_ptr.store(local_ptr, Ordering::SeqCst);
        self.context_ready.store(true, Ordering::SeqCst);

        loop {
            if self.stack_walked.load(Ordering::Relaxed) {
                std::sync::atomic::fence(Ordering::SeqCst);
                break;
            }

            if self.generation() != generation {
                break;
            }

            std::hint::spin_loop();
        }
    }
}

impl Default for HandshakeSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn arm_clears_gates_and_bumps_generation() {
        let slot = HandshakeSlot::new();
        let g1 = slot.arm(42);
        assert_eq!(slot.target_tid(), 42);
        assert!(!slot.context_ready());

        let g2 = slot.arm(43);
        assert!(g2 > g1);
        assert_eq!(slot.target_tid(), 43);
    }

    #[test]
    fn matching_handler_publishes_and_waits_for_release() {
        let slot = Arc::new(HandshakeSlot::new());
        let tid = 7;
        slot.arm(tid);

        let published = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));

        let slot2 = slot.clone();
        let published2 = published.clone();
        let released2 = released.clone();

        let handle = std::thread::spawn(move || unsafe {
            slot2.handle_signal(tid, || {
                published2.fetch_add(1, Ordering::SeqCst);
                CapturedContext {
                    machine_context: ptr::null_mut(),
                    runtime_env: ptr::null_mut(),
                }
            });
            released2.fetch_add(1, Ordering::SeqCst);
        });

        while !slot.context_ready() {
            std::hint::spin_loop();
        }

        assert_eq!(published.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 0);

        slot.release();
        handle.join().unwrap();

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mismatched_target_never_publishes() {
        let slot = HandshakeSlot::new();
        slot.arm(1);

        let mut called = false;
        unsafe {
            slot.handle_signal(2, || {
                called = true;
                CapturedContext {
                    machine_context: ptr::null_mut(),
                    runtime_env: ptr::null_mut(),
                }
            });
        }

        assert!(!called);
        assert!(!slot.context_ready());
    }

    #[test]
    fn only_one_of_two_concurrent_handlers_wins() {
        let slot = Arc::new(HandshakeSlot::new());
        let tid = 9;
        slot.arm(tid);

        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = slot.clone();
                let wins = wins.clone();
                std::thread::spawn(move || unsafe {
                    slot.handle_signal(tid, || {
                        wins.fetch_add(1, Ordering::SeqCst);
                        CapturedContext {
                            machine_context: ptr::null_mut(),
                            runtime_env: ptr::null_mut(),
                        }
                    });
                })
            })
            .collect();

        // give exactly one winner a chance to publish, then release it.
        while !slot.context_ready() {
            std::hint::spin_loop();
        }
        slot.release();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abandon_releases_a_late_publishing_handler() {
        let slot = Arc::new(HandshakeSlot::new());
        let tid = 3;
        slot.arm(tid);

        let slot2 = slot.clone();
        let handle = std::thread::spawn(move || unsafe {
            slot2.handle_signal(tid, || {
                // simulate a handler that is slow to publish, racing
                // against the driver's timeout.
                std::thread::sleep(std::time::Duration::from_millis(20));
                CapturedContext {
                    machine_context: ptr::null_mut(),
                    runtime_env: ptr::null_mut(),
                }
            });
        });

        // driver times out before the handler has published.
        std::thread::sleep(std::time::Duration::from_millis(5));
        slot.abandon();

        // the handler must still return promptly instead of spinning
        // forever on a slot the driver has moved on from.
        handle.join().unwrap();
    }
}
