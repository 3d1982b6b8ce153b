//! Self-observability for the sampling engine, registered the same way the
//! other samplers in this codebase register their own metrics: static
//! `metriken` metrics discovered by the process-wide registry, with no
//! coupling to whatever exposes them.

use metriken::{metric, Counter, Gauge, LazyCounter, LazyGauge};

#[metric(
    name = "wallclock/samples_recorded",
    description = "Total number of execution samples successfully recorded"
)]
pub static SAMPLES_RECORDED: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "wallclock/handshake_timeouts",
    description = "Number of handshakes abandoned because the handler did not publish within HANDSHAKE_TIMEOUT"
)]
pub static HANDSHAKE_TIMEOUTS: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "wallclock/signal_failed",
    description = "Number of times signal delivery to a target thread failed, typically because it had already exited"
)]
pub static SIGNAL_FAILED: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "wallclock/recorder_panicked",
    description = "Number of times the external recorder unwound instead of returning"
)]
pub static RECORDER_PANICKED: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "wallclock/adjusted_interval_ns",
    description = "The current per-iteration interval after adjusting for live thread population"
)]
pub static ADJUSTED_INTERVAL_NS: LazyGauge = LazyGauge::new(Gauge::default);
