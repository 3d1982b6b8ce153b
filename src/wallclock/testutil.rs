//! Test doubles for the driver-side integration tests in [`super::walker`]
//! and [`super::timer`]. Not part of the public API; used only behind
//! `#[cfg(test)]`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{Os, OsThreadState, ThreadList};

/// One simulated target thread: its OS-reported state and what happens
/// when a signal is "delivered" to it.
pub struct FakeTarget {
    pub state: OsThreadState,
    pub exists: bool,
    pub on_signal: Arc<dyn Fn() + Send + Sync>,
}

impl FakeTarget {
    pub fn running(on_signal: impl Fn() + Send + Sync + 'static) -> Self {
        Self { state: OsThreadState::Running, exists: true, on_signal: Arc::new(on_signal) }
    }
}

/// An `Os` double driven entirely by a fixed table of [`FakeTarget`]s.
/// `send_signal` dispatches the target's `on_signal` callback on a freshly
/// spawned thread and returns immediately, the same way real signal
/// delivery (`tgkill`) does not block the sender waiting for the handler to
/// run -- the caller (the driver) always goes on to spin on `context_ready`
/// rather than block inside `send_signal` itself.
pub struct FakeOs {
    targets: Mutex<HashMap<i32, FakeTarget>>,
    order: Vec<i32>,
    sleeps: AtomicUsize,
}

impl FakeOs {
    pub fn new(targets: Vec<(i32, FakeTarget)>) -> Self {
        let order = targets.iter().map(|(tid, _)| *tid).collect();
        let map = targets.into_iter().collect();
        Self { targets: Mutex::new(map), order, sleeps: AtomicUsize::new(0) }
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Os for FakeOs {
    fn now_ns(&self) -> i64 {
        0
    }

    fn sleep(&self, dur: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(dur);
    }

    fn thread_id(&self) -> i32 {
        -1
    }

    fn list_threads(&self) -> Box<dyn ThreadList> {
        Box::new(FixedThreadList { tids: self.order.clone(), pos: 0 })
    }

    fn thread_state(&self, tid: i32) -> Option<OsThreadState> {
        self.targets.lock().unwrap().get(&tid).map(|t| t.state)
    }

    fn send_signal(&self, tid: i32, _signo: i32) -> bool {
        let callback = {
            let targets = self.targets.lock().unwrap();
            match targets.get(&tid) {
                Some(target) if target.exists => target.on_signal.clone(),
                _ => return false,
            }
        };

        // spawned and detached, not joined: the driver must regain control
        // immediately and go on to spin on `context_ready`, exactly as it
        // would after a real `tgkill` that only queues delivery.
        std::thread::spawn(move || callback());
        true
    }

    unsafe fn install_signal_handler(
        &self,
        _signo: i32,
        _handler: extern "C" fn(i32, *mut libc::siginfo_t, *mut libc::c_void),
    ) {
    }
}

struct FixedThreadList {
    tids: Vec<i32>,
    pos: usize,
}

impl ThreadList for FixedThreadList {
    fn next(&mut self) -> Option<i32> {
        let tid = self.tids.get(self.pos).copied();
        if tid.is_some() {
            self.pos += 1;
        }
        tid
    }

    fn rewind(&mut self) {
        self.pos = 0;
    }

    fn size(&self) -> usize {
        self.tids.len()
    }
}

/// A recorder that just appends whatever it was called with, guarded by a
/// plain mutex since these tests never need the real `InMemoryRecorder`'s
/// atomics-based id counter.
pub struct RecordingRecorder {
    pub calls: Mutex<Vec<super::traits::ExecutionEvent>>,
}

impl RecordingRecorder {
    pub fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()) }
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl super::traits::Recorder for RecordingRecorder {
    fn record_sample(
        &self,
        _ctx: *const libc::c_void,
        _interval_ns: u64,
        _kind: super::traits::SampleKind,
        event: super::traits::ExecutionEvent,
        _runtime_env: super::traits::RuntimeEnv,
    ) -> u64 {
        let mut calls = self.calls.lock().unwrap();
        calls.push(event);
        calls.len() as u64
    }
}

/// A `LibraryOracle` that reports everything mapped, for tests that don't
/// care about the page-boundary edge case already covered in
/// `classifier::tests`.
pub struct AlwaysMapped;

impl super::traits::LibraryOracle for AlwaysMapped {
    fn find_library(&self, _addr: usize) -> Option<super::traits::MappedLibrary> {
        Some(super::traits::MappedLibrary { base: 0, end: usize::MAX })
    }
}

/// A fixed [`super::traits::FrameInspector`] double, for exercising the
/// classifier through `StackWalker` without a real `ucontext_t`.
pub struct FixedFrame {
    pub pc: usize,
    pub syscall_at: Vec<usize>,
    pub interrupted: bool,
}

impl super::traits::FrameInspector for FixedFrame {
    fn pc(&self) -> usize {
        self.pc
    }

    fn is_syscall(&self, addr: usize) -> bool {
        self.syscall_at.contains(&addr)
    }

    fn check_interrupted_syscall(&self) -> bool {
        self.interrupted
    }
}
