//! Time source for timestamps, dwell holds and the poll cadence.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Granularity of the interruptible sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    /// Blocks for the full duration.
    fn sleep(&self, duration: Duration);

    /// Blocks for up to `duration`, returning early once `stop` is set.
    /// Returns true if the sleep was cut short.
    fn sleep_until_stopped(&self, duration: Duration, stop: &AtomicBool) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if stop.load(Ordering::SeqCst) {
                return true;
            }
            let step = remaining.min(SLEEP_SLICE);
            self.sleep(step);
            remaining -= step;
        }
        stop.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
