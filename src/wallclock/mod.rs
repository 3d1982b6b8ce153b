//! The wall-clock sampling engine: a cross-thread, signal-mediated
//! stack-capture handshake between a dedicated timer thread and the signal
//! handlers of runtime-managed target threads.
//!
//! [`Engine::start`] installs the sampling signal handler and spawns the
//! timer thread; [`Engine::stop`] tears both down. Everything in between
//! runs without heap allocation on the signal-handler path.

pub mod args;
pub mod classifier;
pub mod error;
pub mod filter;
pub mod handshake;
pub mod metrics;
pub mod recorder;
pub mod runtime;
pub mod signal;
pub mod timer;
pub mod traits;
pub mod walker;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(test)]
mod testutil;

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ringlog::*;

pub use args::Args;
pub use error::Error;
use handshake::HandshakeSlot;
use traits::{FrameInspector, LibraryOracle, Os, Recorder, RuntimeAccessor, ThreadFilter};

/// The interval-virtual-timer signal used to direct a sample request at one
/// specific thread.
pub const SAMPLING_SIGNAL: i32 = libc::SIGPROF;

/// A distinct signal used only to interrupt the timer thread's sleep when
/// stopping, so it is never confused with a sampling request.
pub const WAKEUP_SIGNAL: i32 = libc::SIGALRM;

/// Everything the engine needs from its external collaborators, gathered
/// in one place so `start` has a single, explicit dependency list instead
/// of threading eight parameters through.
pub struct Collaborators {
    pub os: Arc<dyn Os>,
    pub runtime: Arc<dyn RuntimeAccessor>,
    pub recorder: Arc<dyn Recorder>,
    pub oracle: Arc<dyn LibraryOracle>,
    pub filter: Arc<dyn ThreadFilter>,
    pub arch: Arc<dyn classifier::Arch>,
    pub frame_from_context:
        Arc<dyn Fn(*const libc::c_void) -> Box<dyn FrameInspector> + Send + Sync>,
}

#[cfg(target_os = "linux")]
impl Collaborators {
    /// Wires up the real Linux OS facade, a `/proc/self/maps` library
    /// oracle, the `x86_64` frame inspector, and the toy runtime
    /// accessor/recorder, for running this engine standalone (the demo
    /// binary, and this crate's own integration tests). A real embedding
    /// would substitute its own `runtime`, `recorder`, and possibly
    /// `filter`.
    pub fn linux_standalone(recorder: Arc<dyn Recorder>) -> Self {
        Self {
            os: Arc::new(linux::LinuxOs::new()),
            runtime: Arc::new(runtime::TidAsRuntimeEnv),
            recorder,
            oracle: Arc::new(linux::ProcMapsOracle::new()),
            filter: Arc::new(traits::NoFilter),
            arch: Arc::new(classifier::X86_64),
            frame_from_context: Arc::new(|ctx| {
                // SAFETY: only ever called by the driver thread with the
                // context pointer published by the handler for the
                // duration of the recorder call.
                Box::new(unsafe { linux::UcontextFrame::from_raw(ctx) })
            }),
        }
    }
}

/// Owns the running engine. Dropping an `Engine` that hasn't been stopped
/// leaks the timer thread and the signal-handler static; call [`Engine::stop`].
pub struct Engine {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    os: Arc<dyn Os>,
    wakeup_target_tid: Arc<AtomicI32>,
}

impl Engine {
    /// Validates `args`, installs the sampling signal handler, and spawns
    /// the dedicated timer thread. No engine state is mutated if validation
    /// fails. Returns [`Error::AlreadyRunning`] if a previously started
    /// engine hasn't been `stop`ped yet -- only one installation of the
    /// global handshake slot may be active at a time.
    pub fn start(args: Args, collaborators: Collaborators) -> Result<Self, Error> {
        args.validate()?;

        let interval = args.effective_interval();
        let sample_idle = args.sample_idle();

        let slot = Arc::new(HandshakeSlot::new());

        signal::install(
            collaborators.os.as_ref(),
            SAMPLING_SIGNAL,
            slot.clone(),
            collaborators.runtime.clone(),
        )
        .map_err(|_| Error::AlreadyRunning)?;

        signal::install_wakeup_handler(collaborators.os.as_ref(), WAKEUP_SIGNAL);

        let running = Arc::new(AtomicBool::new(true));
        let wakeup_target_tid = Arc::new(AtomicI32::new(handshake::NO_TARGET));

        let running2 = running.clone();
        let wakeup_target_tid2 = wakeup_target_tid.clone();
        let os = collaborators.os.clone();

        let builder = std::thread::Builder::new().name("wallclock-timer".into());

        let handle = builder
            .spawn(move || {
                let self_tid = os.thread_id();
                wakeup_target_tid2.store(self_tid, Ordering::SeqCst);

                let walker = walker::StackWalker {
                    os: os.as_ref(),
                    slot: &slot,
                    recorder: collaborators.recorder.as_ref(),
                    oracle: collaborators.oracle.as_ref(),
                    arch: collaborators.arch.as_ref(),
                    frame_from_context: &|ctx| (collaborators.frame_from_context)(ctx),
                    signo: SAMPLING_SIGNAL,
                    interval_ns: interval.as_nanos() as u64,
                    sample_idle,
                };

                let cfg = timer::TimerLoopConfig {
                    os: os.as_ref(),
                    filter: collaborators.filter.as_ref(),
                    interval,
                    sample_idle,
                };

                timer::run(&cfg, &walker, &running2, self_tid);

                debug!("wallclock timer thread exiting");
            })
            .map_err(Error::SpawnFailed)?;

        info!(
            "wallclock sampling engine started: interval={:?} sample_idle={}",
            interval, sample_idle
        );

        Ok(Self {
            running,
            handle: Some(handle),
            os: collaborators.os,
            wakeup_target_tid,
        })
    }

    /// Clears `running`, wakes the timer thread out of its sleep, joins it,
    /// and tears down the signal-handler static. The timer thread observes
    /// `running == false` at the next loop head.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);

        let tid = self.wakeup_target_tid.load(Ordering::SeqCst);
        if tid != handshake::NO_TARGET {
            self.os.send_signal(tid, WAKEUP_SIGNAL);
        }

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        signal::teardown();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("wallclock Engine dropped without calling stop(); timer thread may be leaked");
        }
    }
}
