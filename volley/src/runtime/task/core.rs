use super::TaskHandle;
use super::slot::Slot;
use super::state::Signals;
use crate::error::{Error, Result};
use crate::runtime::builder::Config;
use crate::runtime::worker;
use crate::time;

use crossbeam_channel::{Sender, select};
use parking_lot::Mutex;
use tracing::debug;

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type TaskFn<T> = Box<dyn FnOnce(&TaskHandle) -> T + Send>;

/// The part of a task consumed by `start`.
struct Body<T> {
    func: TaskFn<T>,
    sender: Sender<thread::Result<T>>,
}

/// A cancellable unit of work executed on its own thread.
///
/// A `Task` wraps a function and coordinates its lifecycle:
/// - [`start`](Self::start) spawns exactly one worker thread,
/// - [`stop`](Self::stop) raises a cooperative stopping signal that the
///   function observes through its [`TaskHandle`],
/// - [`wait`](Self::wait) receives the result once and caches it for every
///   later call.
///
/// The result travels over a rendezvous channel: the worker blocks until
/// it is received by [`wait`](Self::wait), [`wait_for_running`](Self::wait_for_running)
/// or [`discard`](Self::discard). Dropping the `Task` releases the worker.
///
/// Errors from the function itself are not interpreted; return a
/// `Result` as `T` to carry them.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use volley::Task;
///
/// let input = vec![1, 2, 3];
/// let task = Task::new(move |_| input.iter().sum::<i32>());
///
/// task.start().unwrap();
/// assert_eq!(task.wait(Duration::from_secs(1)), Ok(6));
/// ```
pub struct Task<T> {
    signals: Arc<Signals>,
    slot: Arc<Slot<T>>,
    body: Mutex<Option<Body<T>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task running `func`, using the default configuration.
    ///
    /// The task does not run until [`start`](Self::start) is called.
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        Self::with_config(&Config::default(), func)
    }

    /// Creates a task running `func` with the clock of `config`.
    pub fn with_config<F>(config: &Config, func: F) -> Self
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        Self::from_signals(Arc::new(Signals::new(config.clock().clone())), func)
    }

    /// Creates a task running `func` that stops whenever `parent` stops.
    ///
    /// The child uses the parent's clock. Stopping the child does not stop
    /// the parent, and a parent that is already stopping makes the child
    /// stopping from the start, even before it is started.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use volley::Task;
    ///
    /// let parent = Task::new(|handle| handle.wait_for_stop());
    /// let child = Task::with_parent(&parent.handle(), |handle| {
    ///     handle.wait_for_stop();
    ///     "child stopped"
    /// });
    ///
    /// parent.start().unwrap();
    /// child.start().unwrap();
    /// parent.stop().unwrap();
    ///
    /// assert_eq!(child.wait(Duration::from_secs(1)), Ok("child stopped"));
    /// ```
    pub fn with_parent<F>(parent: &TaskHandle, func: F) -> Self
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        let signals = Arc::new(Signals::new(parent.signals.clock.clone()));
        parent.signals.adopt(&signals);

        Self::from_signals(signals, func)
    }

    fn from_signals<F>(signals: Arc<Signals>, func: F) -> Self
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        let (slot, sender) = Slot::new();

        Self {
            signals,
            slot: Arc::new(slot),
            body: Mutex::new(Some(Body {
                func: Box::new(func),
                sender,
            })),
        }
    }

    /// Starts the task on a new worker thread.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyExecuting`] if the task is still executing.
    /// - [`Error::AlreadyFinished`] if the task already completed.
    pub fn start(&self) -> Result<()> {
        self.signals.begin()?;

        let Some(Body { func, sender }) = self.body.lock().take() else {
            return Err(Error::AlreadyExecuting);
        };

        worker::spawn(self.signals.clone(), func, move |outcome| {
            if sender.send(outcome).is_err() {
                debug!("task dropped before its result was received");
            }
        });

        debug!("task started");
        Ok(())
    }

    /// Requests the task to stop.
    ///
    /// This only raises the stopping signal; the function decides when to
    /// return. The call never blocks.
    ///
    /// # Errors
    ///
    /// [`Error::NotExecuting`] if the task never started or a stop was
    /// already requested.
    pub fn stop(&self) -> Result<()> {
        self.signals.request_stop()?;
        debug!("task stop requested");
        Ok(())
    }

    /// Declares whether the task is in its main processing phase.
    ///
    /// Usually called by the task function through its [`TaskHandle`].
    pub fn set_running(&self, running: bool) {
        self.signals.set_running(running);
    }

    /// Blocks until the task declares itself running or finishes.
    ///
    /// A task that finishes without ever setting the running flag satisfies
    /// the wait: its result is received and cached for a later
    /// [`wait`](Self::wait). A zero `timeout` waits indefinitely.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if neither happened within `timeout`.
    pub fn wait_for_running(&self, timeout: Duration) -> Result<()> {
        if self.signals.is_running() || self.slot.is_settled() {
            return Ok(());
        }

        let deadline = time::deadline(&*self.signals.clock, timeout);
        let running = self.signals.running.listener();
        let settled = self.slot.settled.listener();
        let receiver = &self.slot.receiver;

        select! {
            recv(running) -> _ => Ok(()),
            recv(receiver) -> message => {
                if let Ok(outcome) = message {
                    self.slot.settle(outcome);
                }
                Ok(())
            }
            recv(settled) -> _ => Ok(()),
            recv(deadline) -> _ => Err(Error::Timeout),
        }
    }

    /// Waits for the task's result.
    ///
    /// The first successful wait receives the result and caches it; later
    /// calls return the cached value immediately. On timeout the task keeps
    /// executing and can be waited on again. A zero `timeout` waits
    /// indefinitely.
    ///
    /// If the task function panicked, the panic is resumed on the calling
    /// thread.
    ///
    /// # Errors
    ///
    /// - [`Error::NotExecuting`] if the task never started or its result
    ///   was discarded.
    /// - [`Error::Timeout`] if no result arrived within `timeout`.
    pub fn wait(&self, timeout: Duration) -> Result<T>
    where
        T: Clone,
    {
        if !self.signals.is_started() {
            return Err(Error::NotExecuting);
        }

        if let Some(result) = self.slot.get() {
            return result;
        }

        let deadline = time::deadline(&*self.signals.clock, timeout);
        let settled = self.slot.settled.listener();
        let receiver = &self.slot.receiver;

        select! {
            recv(receiver) -> message => match message {
                Ok(outcome) => self.slot.settle(outcome),
                // Another receiver took the result and is settling it.
                Err(_) => self.slot.settled.wait(),
            },
            recv(settled) -> _ => {}
            recv(deadline) -> _ => return Err(Error::Timeout),
        }

        self.signals.set_running(false);
        self.slot.get().unwrap_or(Err(Error::NotExecuting))
    }

    /// Stops the task, then waits for its result.
    ///
    /// # Errors
    ///
    /// Fails with the error of [`stop`](Self::stop) without waiting, or with
    /// the error of [`wait`](Self::wait).
    pub fn stop_and_wait(&self, timeout: Duration) -> Result<T>
    where
        T: Clone,
    {
        self.stop()?;
        self.wait(timeout)
    }

    /// Starts the task and waits for its result without a timeout.
    pub fn start_sync(&self) -> Result<T>
    where
        T: Clone,
    {
        self.start()?;
        self.wait(Duration::ZERO)
    }

    /// Throws away the task's eventual result.
    ///
    /// A background thread receives the result so the worker can exit
    /// without anyone calling [`wait`](Self::wait). May be called before
    /// the task starts. Only the first call has an effect, and a result
    /// already received by a wait stays cached.
    pub fn discard(&self) {
        self.slot.discard();
    }

    /// Returns a handle observing this task's signals.
    ///
    /// Mostly used as the parent of [`with_parent`](Self::with_parent) or
    /// [`Collector::run_with_parent`](crate::Collector::run_with_parent).
    pub fn handle(&self) -> TaskHandle {
        TaskHandle::new(self.signals.clone())
    }

    /// Returns `true` once the task has been started.
    pub fn is_started(&self) -> bool {
        self.signals.is_started()
    }

    /// Returns `true` while the task declares itself running.
    pub fn is_running(&self) -> bool {
        self.signals.is_running()
    }

    /// Returns `true` once a stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.signals.is_stopping()
    }

    /// Returns `true` once the task function has returned.
    pub fn is_finished(&self) -> bool {
        self.signals.is_finished()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("started", &self.signals.is_started())
            .field("running", &self.signals.is_running())
            .field("stopping", &self.signals.is_stopping())
            .field("finished", &self.signals.is_finished())
            .finish_non_exhaustive()
    }
}
