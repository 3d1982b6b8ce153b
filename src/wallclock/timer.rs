//! The dedicated timer thread: paces iterations, enumerates candidate
//! threads, and drives the [`StackWalker`] with an adaptive interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::metrics;
use super::traits::{Os, OsThreadState, ThreadFilter};
use super::walker::StackWalker;

/// Hard cap on targets sampled per iteration, bounding signal-storm
/// amplitude.
pub const THREADS_PER_TICK: usize = 8;

/// Floor on iteration sleep, preventing degenerate busy loops when the
/// population grows without bound.
pub const MIN_INTERVAL: Duration = Duration::from_micros(100);

/// Divides `interval` by `ceil(n / THREADS_PER_TICK)` when the population
/// exceeds the per-tick cap, otherwise returns it unchanged. Keeps
/// per-thread cadence roughly constant as the population grows.
pub fn adjust_interval(interval: Duration, n: usize) -> Duration {
    if n > THREADS_PER_TICK {
        let divisor = n.div_ceil(THREADS_PER_TICK) as u32;
        interval / divisor
    } else {
        interval
    }
}

pub struct TimerLoopConfig<'a> {
    pub os: &'a dyn Os,
    pub filter: &'a dyn ThreadFilter,
    pub interval: Duration,
    pub sample_idle: bool,
}

/// Runs the pacing loop until `running` is cleared.
/// `self_tid` identifies the timer thread itself so it never samples
/// itself.
pub fn run(
    cfg: &TimerLoopConfig<'_>,
    walker: &StackWalker<'_>,
    running: &AtomicBool,
    self_tid: i32,
) {
    let mut next_cycle = Instant::now();
    let mut threads = cfg.os.list_threads();

    while running.load(Ordering::SeqCst) {
        if cfg.sample_idle {
            let estimate = if cfg.filter.enabled() {
                cfg.filter.size()
            } else {
                threads.size()
            };

            let adjusted = super::timer::adjust_interval(cfg.interval, estimate);
            metrics::ADJUSTED_INTERVAL_NS.set(adjusted.as_nanos() as i64);
            next_cycle += adjusted;
        }

        let mut count = 0;

        while count < THREADS_PER_TICK {
            let tid = match threads.next() {
                Some(tid) => tid,
                None => {
                    threads.rewind();
                    break;
                }
            };

            if tid == self_tid {
                continue;
            }

            if cfg.filter.enabled() && !cfg.filter.accept(tid) {
                continue;
            }

            let should_sample = cfg.sample_idle
                || matches!(cfg.os.thread_state(tid), Some(OsThreadState::Running));

            if should_sample && walker.walk_stack(tid) {
                count += 1;
            }
        }

        if cfg.sample_idle {
            let now = Instant::now();
            let slack = next_cycle.saturating_duration_since(now);

            if slack > MIN_INTERVAL {
                cfg.os.sleep(slack);
            } else {
                next_cycle = now + MIN_INTERVAL;
                cfg.os.sleep(MIN_INTERVAL);
            }
        } else {
            cfg.os.sleep(cfg.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_interval_unchanged_below_cap() {
        assert_eq!(adjust_interval(Duration::from_millis(10), 8), Duration::from_millis(10));
        assert_eq!(adjust_interval(Duration::from_millis(10), 1), Duration::from_millis(10));
    }

    #[test]
    fn adjust_interval_divides_above_cap() {
        // 64 threads -> ceil(64/8) == 8 -> 10ms / 8 == 1.25ms
        assert_eq!(adjust_interval(Duration::from_millis(10), 64), Duration::from_micros(1250));
    }

    #[test]
    fn adjust_interval_rounds_up_divisor() {
        // 9 threads -> ceil(9/8) == 2 -> 10ms / 2 == 5ms
        assert_eq!(adjust_interval(Duration::from_millis(10), 9), Duration::from_millis(5));
    }
}
