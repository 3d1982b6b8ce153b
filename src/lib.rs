//! A wall-clock sampling engine for a managed-runtime profiler: the
//! cross-thread, signal-mediated stack-capture handshake between a
//! dedicated timer thread and the signal handlers of its target threads.
//!
//! See the `wallclock` module for the engine itself.

pub use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
pub use std::sync::Arc;
pub use std::time::{Duration, Instant};

pub mod config;
pub mod wallclock;

pub use config::Config;
pub use wallclock::{Args, Collaborators, Engine, Error};
