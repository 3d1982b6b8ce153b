//! The driver side of the handshake: selects a target, triggers the
//! signal, waits for the handler to publish, invokes the recorder, and
//! releases the handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::classifier::{self, Arch};
use super::handshake::HandshakeSlot;
use super::metrics;
use super::traits::{ExecutionEvent, FrameInspector, LibraryOracle, Os, Recorder, SampleKind, ThreadState};

/// Timer-side wait for the handler to publish its context.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(10);

pub struct StackWalker<'a> {
    pub os: &'a dyn Os,
    pub slot: &'a Arc<HandshakeSlot>,
    pub recorder: &'a dyn Recorder,
    pub oracle: &'a dyn LibraryOracle,
    pub arch: &'a dyn Arch,
    pub frame_from_context: &'a dyn Fn(*const libc::c_void) -> Box<dyn FrameInspector>,
    pub signo: i32,
    pub interval_ns: u64,
    pub sample_idle: bool,
}

impl<'a> StackWalker<'a> {
    /// Attempts to sample `tid`. Returns `true` if a sample was recorded.
    pub fn walk_stack(&self, tid: i32) -> bool {
        self.slot.arm(tid);

        if !self.os.send_signal(tid, self.signo) {
            self.slot.abandon();
            metrics::SIGNAL_FAILED.increment();
            return false;
        }

        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;

        while !self.slot.context_ready() {
            if Instant::now() >= deadline {
                self.slot.abandon();
                metrics::HANDSHAKE_TIMEOUTS.increment();
                return false;
            }
            std::hint::spin_loop();
        }

        let captured = self.slot.context_ptr();
        debug_assert!(!captured.is_null());

        // SAFETY: `context_ready` is only set true after the handler has
        // fully published `captured`, and it remains live until we call
        // `release` below.
        let (machine_context, runtime_env) = unsafe {
            let ctx = &*captured;
            (ctx.machine_context, ctx.runtime_env)
        };

        let thread_state = if self.sample_idle {
            let frame = (self.frame_from_context)(machine_context as *const _);
            classifier::classify(self.arch, frame.as_ref(), self.oracle)
        } else {
            ThreadState::Unknown
        };

        let event = ExecutionEvent { thread_state };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.recorder.record_sample(
                machine_context as *const _,
                self.interval_ns,
                SampleKind::ExecutionSample,
                event,
                runtime_env,
            )
        }));

        // the handler must be released regardless of whether the recorder
        // panicked: leaving it pinned would be worse than losing a sample.
        self.slot.release();

        match result {
            Ok(_) => {
                metrics::SAMPLES_RECORDED.increment();
                true
            }
            Err(_) => {
                metrics::RECORDER_PANICKED.increment();
                false
            }
        }
    }
}
