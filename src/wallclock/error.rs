use thiserror::Error;

/// Errors returned across the public API boundary of the wall-clock sampling
/// engine.
///
/// `TransientPerSample` failures (signal delivery races, handshake timeouts,
/// vanished threads) never reach here -- they're logged and counted inside
/// the timer loop and the iteration continues. Only configuration and
/// startup failures are reported to the caller, per the error handling
/// design: no state is mutated when either is returned from `start`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid wall-clock sampling interval: {0}")]
    InvalidInterval(String),
    #[error("invalid event name: {0}")]
    InvalidEvent(String),
    #[error("failed to spawn the timer thread: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("engine is already running")]
    AlreadyRunning,
}
