//! Fixed-rate pacing for the worker threads.

use std::time::{Duration, Instant};

use tracing::debug;

/// Stalls longer than this many periods rebase the schedule instead of
/// replaying the backlog.
const REBASE_FACTOR: u32 = 10;

/// Final slice of each period burned in a spin loop when tight pacing is
/// requested.
const SPIN_WINDOW: Duration = Duration::from_micros(100);

/// Two-phase fixed-rate scheduler: coarse sleep for most of the period,
/// optional fine spin for the tail.
///
/// The deadline accumulates (`next += period`) rather than re-anchoring on
/// wakeup, so jitter in one iteration is absorbed by the next instead of
/// drifting the rate. A stall beyond [`REBASE_FACTOR`] periods (debugger
/// break, OS suspend) rebases to `now + period` so the loop does not burn
/// a catch-up burst.
pub struct FixedRateScheduler {
    period: Duration,
    next: Instant,
}

impl FixedRateScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until the next deadline. Returns `true` if the schedule was
    /// rebased after a long stall.
    ///
    /// With `spin_tightly` the last [`SPIN_WINDOW`] of the wait busy-spins
    /// (yielding periodically); otherwise the whole remainder is slept.
    pub fn wait(&mut self, spin_tightly: bool) -> bool {
        let now = Instant::now();

        if now >= self.next {
            let behind = now - self.next;
            if behind > self.period * REBASE_FACTOR {
                debug!(?behind, "scheduler stalled, rebasing");
                self.next = now + self.period;
                return true;
            }
            // Late but close: skip the wait, keep the cadence anchored.
            self.next += self.period;
            return false;
        }

        let remaining = self.next - now;
        if spin_tightly {
            if remaining > SPIN_WINDOW {
                std::thread::sleep(remaining - SPIN_WINDOW);
            }
            let mut spins = 0u32;
            while Instant::now() < self.next {
                spins += 1;
                if spins.is_multiple_of(64) {
                    std::thread::yield_now();
                } else {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(remaining);
        }

        self.next += self.period;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_pace_over_several_ticks() {
        let period = Duration::from_millis(2);
        let mut sched = FixedRateScheduler::new(period);
        let start = Instant::now();
        for _ in 0..10 {
            assert!(!sched.wait(false));
        }
        let elapsed = start.elapsed();
        // Ten periods of 2 ms; generous upper bound for CI jitter.
        assert!(elapsed >= Duration::from_millis(18), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(200), "{elapsed:?}");
    }

    #[test]
    fn rebases_after_a_long_stall() {
        let period = Duration::from_millis(1);
        let mut sched = FixedRateScheduler::new(period);
        sched.wait(false);
        std::thread::sleep(Duration::from_millis(50));
        assert!(sched.wait(false), "expected rebase after 50x stall");
        // After rebasing the next wait behaves normally again.
        assert!(!sched.wait(false));
    }

    #[test]
    fn spin_mode_hits_the_deadline() {
        let period = Duration::from_millis(2);
        let mut sched = FixedRateScheduler::new(period);
        let start = Instant::now();
        for _ in 0..5 {
            sched.wait(true);
        }
        assert!(start.elapsed() >= Duration::from_millis(9));
    }
}
