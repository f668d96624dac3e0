use crossbeam_channel::Receiver;

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// A single-fire wakeup signal.
///
/// The receiver yields exactly one `Instant` once the requested duration
/// has elapsed on the clock that produced it.
pub type Wakeup = Receiver<Instant>;

/// A source of time used for every timeout in the crate.
///
/// Production code uses [`SystemClock`]. Tests inject a
/// [`MockClock`](super::MockClock) so that timeouts fire only when the test
/// advances time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant according to this clock.
    fn now(&self) -> Instant;

    /// Returns a wakeup that fires once `duration` has elapsed.
    fn after(&self, duration: Duration) -> Wakeup;

    /// Blocks the calling thread for `duration` of this clock's time.
    fn sleep(&self, duration: Duration) {
        let _ = self.after(duration).recv();
    }
}

/// The real-time clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn after(&self, duration: Duration) -> Wakeup {
        crossbeam_channel::after(duration)
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
