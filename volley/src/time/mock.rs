use super::clock::{Clock, Wakeup};
use super::timer::TimerEntry;

use crossbeam_channel::bounded;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A manually advanced virtual clock.
///
/// Time only moves when [`advance`](Self::advance) is called. Wakeups
/// requested through [`Clock::after`] are kept in a deadline-ordered heap
/// and fire once the virtual time reaches their deadline, which makes
/// timeout behaviour fully deterministic in tests.
///
/// Clones share the same virtual time and pending wakeups.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use volley::time::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let wakeup = clock.after(Duration::from_millis(10));
///
/// clock.advance(Duration::from_millis(5));
/// assert!(wakeup.try_recv().is_err());
///
/// clock.advance(Duration::from_millis(5));
/// assert!(wakeup.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,

    /// Notified whenever a wakeup is registered.
    registered: Condvar,
}

#[derive(Debug)]
struct State {
    now: Instant,
    timers: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

impl MockClock {
    /// Creates a mock clock starting at the current real instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a mock clock starting at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    now,
                    timers: BinaryHeap::new(),
                    next_seq: 0,
                }),
                registered: Condvar::new(),
            }),
        }
    }

    /// Moves virtual time forward by `duration` and fires every wakeup
    /// whose deadline has been reached, earliest first.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.state.lock();
        state.now += duration;
        let now = state.now;

        let mut fired = 0usize;
        while state.timers.peek().is_some_and(|entry| entry.deadline <= now) {
            if let Some(entry) = state.timers.pop() {
                entry.fire(now);
                fired += 1;
            }
        }

        trace!(?duration, fired, "mock clock advanced");
    }

    /// Returns the number of wakeups registered but not yet fired.
    ///
    /// Wakeups whose receiver was dropped still count until their deadline
    /// passes.
    pub fn waiters(&self) -> usize {
        self.inner.state.lock().timers.len()
    }

    /// Blocks until at least `count` wakeups are pending.
    pub fn block_until_waiters(&self, count: usize) {
        let mut state = self.inner.state.lock();

        while state.timers.len() < count {
            self.inner.registered.wait(&mut state);
        }
    }

    /// Waits for at least one pending wakeup, then advances by `duration`.
    pub fn blocking_advance(&self, duration: Duration) {
        self.block_until_waiters(1);
        self.advance(duration);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.inner.state.lock().now
    }

    fn after(&self, duration: Duration) -> Wakeup {
        let (sender, receiver) = bounded(1);
        let mut state = self.inner.state.lock();

        if duration.is_zero() {
            let _ = sender.try_send(state.now);
            return receiver;
        }

        let deadline = state.now + duration;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.push(TimerEntry {
            deadline,
            seq,
            sender,
        });

        self.inner.registered.notify_all();
        receiver
    }
}
