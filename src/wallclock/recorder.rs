//! A concrete, in-memory [`Recorder`] used by the demo binary and the
//! engine's own integration tests. The real sample recorder is out of
//! scope; this double simply appends to a `Vec`.

use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;

use super::traits::{ExecutionEvent, Recorder, RuntimeEnv, SampleKind};

#[derive(Clone)]
pub struct RecordedSample {
    pub interval_ns: u64,
    pub kind: SampleKind,
    pub event: ExecutionEvent,
    pub runtime_env: RuntimeEnv,
}

// SAFETY: `runtime_env` is an opaque handle threaded through unchanged; this
// double never dereferences it, only stores and later reads the integer
// value back out for assertions.
unsafe impl Send for RecordedSample {}

pub struct InMemoryRecorder {
    samples: Mutex<Vec<RecordedSample>>,
    next_id: AtomicU64,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn samples(&self) -> Vec<RecordedSample> {
        self.samples.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder for InMemoryRecorder {
    fn record_sample(
        &self,
        _ctx: *const libc::c_void,
        interval_ns: u64,
        kind: SampleKind,
        event: ExecutionEvent,
        runtime_env: RuntimeEnv,
    ) -> u64 {
        self.samples.lock().push(RecordedSample {
            interval_ns,
            kind,
            event,
            runtime_env,
        });
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}
