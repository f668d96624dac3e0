use super::state::Signals;
use crate::time::Clock;

use crossbeam_channel::Receiver;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The view of a task given to its function.
///
/// A task function uses its handle to cooperate with the owner of the
/// task: it polls or blocks on the stopping signal, and declares when it
/// has entered its main processing phase.
///
/// Handles are cheap to clone and can be moved to helper threads spawned by
/// the task function.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use volley::Task;
///
/// let task = Task::new(|handle| {
///     handle.set_running(true);
///     handle.wait_for_stop();
///     "stopped"
/// });
///
/// task.start().unwrap();
/// task.wait_for_running(Duration::ZERO).unwrap();
///
/// assert_eq!(task.stop_and_wait(Duration::ZERO), Ok("stopped"));
/// ```
#[derive(Clone)]
pub struct TaskHandle {
    pub(crate) signals: Arc<Signals>,
}

impl TaskHandle {
    pub(crate) fn new(signals: Arc<Signals>) -> Self {
        Self { signals }
    }

    /// Returns `true` once the owner requested the task to stop.
    pub fn is_stopping(&self) -> bool {
        self.signals.is_stopping()
    }

    /// Blocks until the owner requests the task to stop.
    pub fn wait_for_stop(&self) {
        self.signals.stopping.wait();
    }

    /// Returns a receiver that disconnects when a stop is requested.
    ///
    /// No message is ever sent on it; use it as a `select!` arm next to the
    /// task's own channels.
    pub fn stop_signal(&self) -> Receiver<()> {
        self.signals.stopping.listener()
    }

    /// Declares whether the task is in its main processing phase.
    ///
    /// May be toggled any number of times. The flag is cleared when the
    /// task function returns.
    pub fn set_running(&self, running: bool) {
        self.signals.set_running(running);
    }

    /// Returns the clock configured for this task.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.signals.clock
    }

    /// Sleeps for `duration` on the task's clock.
    pub fn sleep(&self, duration: Duration) {
        self.signals.clock.sleep(duration);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("stopping", &self.signals.is_stopping())
            .field("running", &self.signals.is_running())
            .finish()
    }
}
