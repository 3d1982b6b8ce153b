//! The external collaborators this engine depends on. Each is specified by
//! its behavioral contract, not by an implementation: the `linux` module
//! supplies one real implementation of each, and `testutil` supplies doubles
//! used by the engine's own test suite.

use std::time::Duration;

/// OS-reported execution state of a thread, as returned by
/// [`Os::thread_state`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OsThreadState {
    Running,
    Other,
}

/// A cursor over the current set of threads in the process. Implementations
/// keep their own position; `next` advances it and `rewind` resets it to the
/// start so that repeated calls across iterations give every thread an
/// equal long-run share.
pub trait ThreadList: Send {
    /// Returns the next candidate tid, or `None` at the end of one full
    /// pass.
    fn next(&mut self) -> Option<i32>;

    /// Resets the cursor to the beginning.
    fn rewind(&mut self);

    /// The number of threads as of the last refresh.
    fn size(&self) -> usize;
}

/// Abstracts the OS primitives the timer loop and stack walker need:
/// monotonic time, sleeping, thread enumeration and state, and signal
/// delivery/installation.
pub trait Os: Send + Sync {
    /// Monotonic nanoseconds, suitable for measuring elapsed intervals.
    fn now_ns(&self) -> i64;

    /// Sleeps for approximately the given duration. May return early if
    /// interrupted; callers that need a floor should check elapsed time.
    fn sleep(&self, dur: Duration);

    /// The calling thread's OS tid.
    fn thread_id(&self) -> i32;

    /// Builds a fresh cursor over the process's current threads.
    fn list_threads(&self) -> Box<dyn ThreadList>;

    /// The OS-reported run state of `tid`, if the thread still exists.
    fn thread_state(&self, tid: i32) -> Option<OsThreadState>;

    /// Delivers `signo` to `tid` specifically (not just to the process).
    /// Returns `false` if the thread no longer exists.
    fn send_signal(&self, tid: i32, signo: i32) -> bool;

    /// Installs `handler` as the disposition for `signo`, restarting
    /// interrupted syscalls elsewhere in the process.
    ///
    /// # Safety
    /// `handler` must be async-signal-safe: it may only touch memory it owns
    /// outright and atomics, and must not allocate, lock a mutex, or call
    /// any non-reentrant library function.
    unsafe fn install_signal_handler(&self, signo: i32, handler: extern "C" fn(i32, *mut libc::siginfo_t, *mut libc::c_void));
}

/// A handle to whatever the managed runtime associates with the currently
/// executing thread. Opaque to the engine; threaded through to the
/// recorder.
pub type RuntimeEnv = *mut libc::c_void;

/// Returns the runtime-environment handle for the calling thread, or a null
/// pointer if the runtime hasn't attached this thread.
///
/// Must be callable from signal-handler context: no allocation, no locks,
/// reentrant with respect to itself.
pub trait RuntimeAccessor: Send + Sync {
    fn current_runtime_env(&self) -> RuntimeEnv;
}

/// A mapped library, as reported by a [`LibraryOracle`].
pub struct MappedLibrary {
    pub base: usize,
    pub end: usize,
}

/// Answers whether an address falls inside some mapped, executable region.
/// Used only to decide whether a speculative read one instruction behind
/// the interrupted PC can safely be performed.
pub trait LibraryOracle: Send + Sync {
    fn find_library(&self, addr: usize) -> Option<MappedLibrary>;
}

/// A view over the machine context captured by the signal handler, used by
/// [`crate::wallclock::classifier`] to classify the interrupted thread.
pub trait FrameInspector {
    /// The interrupted program counter.
    fn pc(&self) -> usize;

    /// Whether the bytes at `addr` encode this architecture's syscall
    /// instruction. Caller is responsible for ensuring the read cannot
    /// fault.
    fn is_syscall(&self, addr: usize) -> bool;

    /// True if the saved register state is consistent with the kernel
    /// having just delivered EINTR to an interrupted syscall.
    fn check_interrupted_syscall(&self) -> bool;
}

/// The final classification of a sampled thread.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Sleeping,
    Unknown,
}

/// The kind of sample being recorded. The engine only ever produces
/// `ExecutionSample`; the type exists so the recorder's contract can be
/// shared with sibling engines that are out of scope here.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleKind {
    ExecutionSample,
}

/// One captured execution sample, handed to the [`Recorder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExecutionEvent {
    pub thread_state: ThreadState,
}

/// The opaque sink samples are delivered to. Must not retain `ctx` beyond
/// the call and must not block indefinitely -- the driver thread is paced
/// by this call, and a slow recorder directly lengthens every sampling
/// cycle.
pub trait Recorder: Send + Sync {
    /// `ctx` is only valid for the duration of this call.
    fn record_sample(
        &self,
        ctx: *const libc::c_void,
        interval_ns: u64,
        kind: SampleKind,
        event: ExecutionEvent,
        runtime_env: RuntimeEnv,
    ) -> u64;
}

/// Restricts sampling to a subset of threads. Consulted once per candidate
/// per iteration.
pub trait ThreadFilter: Send + Sync {
    fn enabled(&self) -> bool;
    fn size(&self) -> usize;
    fn accept(&self, tid: i32) -> bool;
}

/// A filter that is always disabled; `accept` is never consulted.
pub struct NoFilter;

impl ThreadFilter for NoFilter {
    fn enabled(&self) -> bool {
        false
    }

    fn size(&self) -> usize {
        0
    }

    fn accept(&self, _tid: i32) -> bool {
        true
    }
}
