use std::time::Duration;

const MAX_BACKOFF_SHIFT: u32 = 16;

/// Blocking pause used for the warm-up pause and backoff sleeps.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<F: Fn(Duration)> Sleeper for F {
    fn sleep(&self, duration: Duration) {
        self(duration)
    }
}

/// Delay after failed attempt `attempt` (1-based): `unit * 2^attempt`, i.e. 2, 4, 8, … units.
pub(crate) fn backoff_delay(attempt: u32, unit: Duration) -> Duration {
    let factor = 1u32 << attempt.min(MAX_BACKOFF_SHIFT);
    unit.saturating_mul(factor)
}
