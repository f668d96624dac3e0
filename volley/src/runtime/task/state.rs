use crate::error::{Error, Result};
use crate::sync::Latch;
use crate::time::Clock;

use parking_lot::Mutex;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Task has been created but not started.
pub(crate) const IDLE: usize = 0;

/// Task has been started and its function has not returned yet.
pub(crate) const EXECUTING: usize = 1;

/// Task function has returned.
///
/// The result may still be in flight towards its receiver.
pub(crate) const FINISHED: usize = 2;

/// Lifecycle flags shared by a task, its worker thread and every
/// [`TaskHandle`](super::TaskHandle).
pub(crate) struct Signals {
    /// One of [`IDLE`], [`EXECUTING`] or [`FINISHED`].
    state: AtomicUsize,

    /// Monotonic cooperative cancellation signal.
    pub(crate) stopping: Latch,

    /// User-controlled "main phase entered" flag.
    pub(crate) running: Latch,

    /// Clock the task uses for its own waits.
    pub(crate) clock: Arc<dyn Clock>,

    /// Tasks whose stopping signal follows this one.
    children: Mutex<Vec<Weak<Signals>>>,
}

impl Signals {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: AtomicUsize::new(IDLE),
            stopping: Latch::new(),
            running: Latch::new(),
            clock,
            children: Mutex::new(Vec::new()),
        }
    }

    /// Makes `child` stop whenever this task stops.
    ///
    /// A child adopted after this task was signalled is signalled at once.
    pub(crate) fn adopt(&self, child: &Arc<Signals>) {
        let mut children = self.children.lock();
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Arc::downgrade(child));

        if self.is_stopping() {
            child.raise_stop();
        }
    }

    /// Opens the stopping latch and forwards it to every live child.
    ///
    /// Returns `false` if the latch was already open.
    fn raise_stop(&self) -> bool {
        if !self.stopping.open() {
            return false;
        }

        let children: Vec<_> = self
            .children
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for child in children {
            child.raise_stop();
        }
        true
    }

    /// Transitions `IDLE -> EXECUTING`.
    ///
    /// Fails with [`Error::AlreadyFinished`] if the task already completed
    /// and with [`Error::AlreadyExecuting`] if it is still executing.
    pub(crate) fn begin(&self) -> Result<()> {
        match self
            .state
            .compare_exchange(IDLE, EXECUTING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(FINISHED) => Err(Error::AlreadyFinished),
            Err(_) => Err(Error::AlreadyExecuting),
        }
    }

    /// Transitions `EXECUTING -> FINISHED` and forces the running flag off.
    pub(crate) fn finish(&self) {
        self.state.store(FINISHED, Ordering::Release);
        self.running.close();
    }

    /// Raises the stopping signal.
    ///
    /// Fails with [`Error::NotExecuting`] if the task never started or was
    /// already signalled.
    pub(crate) fn request_stop(&self) -> Result<()> {
        if !self.is_started() {
            return Err(Error::NotExecuting);
        }

        if !self.raise_stop() {
            return Err(Error::NotExecuting);
        }

        Ok(())
    }

    /// Sets or clears the running flag. Setting it after the task finished
    /// has no effect.
    pub(crate) fn set_running(&self, running: bool) {
        if running {
            self.running.open_if(|| !self.is_finished());
        } else {
            self.running.close();
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state.load(Ordering::Acquire) == FINISHED
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.is_open()
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.is_open()
    }
}
