//! Fan-out/join aggregation of many task functions.

mod drain;

use crate::error::{Error, Result};
use crate::runtime::builder::Config;
use crate::runtime::task::TaskHandle;
use crate::runtime::task::state::Signals;
use crate::runtime::worker;
use crate::time;

use crossbeam_channel::{Receiver, Sender, bounded, select};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use std::any::Any;
use std::fmt;
use std::mem;
use std::panic;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A result sent by a collector task, tagged with its submission index.
struct Arrival<T> {
    index: usize,
    outcome: thread::Result<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accepting tasks and waits.
    Collecting,

    /// A wait returned every result.
    Exhausted,

    /// A `wait_closer` timed out and a drain owns the outstanding results.
    Draining,
}

/// Bookkeeping guarded by the collector mutex.
struct Ledger<T> {
    /// One handle per submitted task, in submission order.
    tasks: Vec<TaskHandle>,

    /// Result slot `i` belongs to the `i`-th submitted task.
    results: Vec<Option<T>>,

    /// Tasks whose result has not arrived yet.
    pending: usize,

    phase: Phase,

    /// First panic received from a task function.
    panic: Option<Box<dyn Any + Send>>,
}

impl<T> Ledger<T> {
    fn record(&mut self, arrival: Arrival<T>) {
        match arrival.outcome {
            Ok(value) => self.results[arrival.index] = Some(value),
            Err(payload) => {
                warn!(index = arrival.index, "collector task panicked");
                self.panic.get_or_insert(payload);
            }
        }
        self.pending -= 1;
    }
}

/// Runs many task functions concurrently and joins on all of their results.
///
/// Every call to [`run`](Self::run) starts one task on its own worker
/// thread. [`wait`](Self::wait) then collects the results in submission
/// order, whatever order they complete in.
///
/// The first successful wait consumes the collector: a later wait fails
/// with [`Error::AlreadyFinished`].
///
/// Results travel over a single rendezvous channel. A worker stays blocked
/// on its send until the result is received, so after a timeout either
/// wait again, use [`wait_closer`](Self::wait_closer) to drain stragglers
/// in the background, or drop the collector, which disconnects the channel
/// and releases every worker.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use volley::Collector;
///
/// let collector = Collector::new();
///
/// for n in 1..=3 {
///     collector.run(move |_| n * n).unwrap();
/// }
///
/// assert_eq!(collector.wait(Duration::from_secs(1)), Ok(vec![1, 4, 9]));
/// ```
pub struct Collector<T> {
    config: Config,

    ledger: Mutex<Ledger<T>>,

    /// Serializes waits so that a single thread receives at a time.
    gate: Mutex<()>,

    sender: Sender<Arrival<T>>,
    receiver: Receiver<Arrival<T>>,
}

impl<T: Send + 'static> Collector<T> {
    /// Creates an empty collector using the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty collector using `config`.
    pub fn with_config(config: Config) -> Self {
        let (sender, receiver) = bounded(0);

        Self {
            config,
            ledger: Mutex::new(Ledger {
                tasks: Vec::new(),
                results: Vec::new(),
                pending: 0,
                phase: Phase::Collecting,
                panic: None,
            }),
            gate: Mutex::new(()),
            sender,
            receiver,
        }
    }

    /// Starts `func` on a new worker and reserves the next result slot.
    ///
    /// Safe to call from several threads; slots are reserved in the order
    /// the calls acquire the collector lock.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyFinished`] if the collector was consumed by a
    /// successful wait or handed to a drain.
    pub fn run<F>(&self, func: F) -> Result<()>
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        let signals = Arc::new(Signals::new(self.config.clock().clone()));
        self.launch(signals, func)
    }

    /// Starts `func` like [`run`](Self::run), stopping it whenever `parent`
    /// stops.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_parent<F>(&self, parent: &TaskHandle, func: F) -> Result<()>
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        let signals = Arc::new(Signals::new(self.config.clock().clone()));
        parent.signals.adopt(&signals);

        self.launch(signals, func)
    }

    fn launch<F>(&self, signals: Arc<Signals>, func: F) -> Result<()>
    where
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        signals.begin()?;

        let index = {
            let mut ledger = self.ledger.lock();
            if ledger.phase != Phase::Collecting {
                return Err(Error::AlreadyFinished);
            }

            let index = ledger.results.len();
            ledger.results.push(None);
            ledger.tasks.push(TaskHandle::new(signals.clone()));
            ledger.pending += 1;
            index
        };

        let sender = self.sender.clone();
        worker::spawn(signals, func, move |outcome| {
            if sender.send(Arrival { index, outcome }).is_err() {
                debug!(index, "collector dropped before the result was received");
            }
        });

        trace!(index, "collector task started");
        Ok(())
    }

    /// Waits until every submitted task has delivered its result.
    ///
    /// The timeout applies between arrivals: each received result restarts
    /// the window. A zero `timeout` waits indefinitely. On timeout no
    /// partial results are returned; results received so far stay in their
    /// slots and a later wait resumes collecting.
    ///
    /// If a task function panicked, the panic is resumed on the calling
    /// thread once every result has arrived.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no result arrived within `timeout`.
    /// - [`Error::AlreadyFinished`] if a previous wait already returned the
    ///   results, or a drain owns them.
    pub fn wait(&self, timeout: Duration) -> Result<Vec<T>> {
        let _gate = self.gate.lock();
        self.gather(timeout)
    }

    /// Waits like [`wait`](Self::wait), draining in the background on
    /// timeout.
    ///
    /// On timeout this returns immediately and a background thread passes
    /// every result to `closer` exactly once: first the results that
    /// already arrived, then each straggler as it arrives. The collector is
    /// consumed by the drain. A panic inside `closer` is logged and does not
    /// stop the drain.
    ///
    /// # Errors
    ///
    /// Same as [`wait`](Self::wait).
    pub fn wait_closer<C>(&self, timeout: Duration, closer: C) -> Result<Vec<T>>
    where
        C: FnMut(T) + Send + 'static,
    {
        let _gate = self.gate.lock();

        match self.gather(timeout) {
            Err(Error::Timeout) => {
                self.hand_off(closer);
                Err(Error::Timeout)
            }
            other => other,
        }
    }

    /// Raises the stopping signal of every task submitted so far.
    ///
    /// Returns how many tasks were newly signalled.
    pub fn stop(&self) -> usize {
        let ledger = self.ledger.lock();

        let stopped = ledger
            .tasks
            .iter()
            .filter(|task| task.signals.request_stop().is_ok())
            .count();

        debug!(stopped, "collector stop requested");
        stopped
    }

    /// Returns the number of tasks submitted.
    pub fn len(&self) -> usize {
        self.ledger.lock().tasks.len()
    }

    /// Returns `true` if no task was submitted.
    pub fn is_empty(&self) -> bool {
        self.ledger.lock().tasks.is_empty()
    }

    /// Returns the number of results not received yet.
    pub fn pending(&self) -> usize {
        self.ledger.lock().pending
    }

    /// Receives results until all arrived or the window elapses.
    ///
    /// Callers hold the gate.
    fn gather(&self, timeout: Duration) -> Result<Vec<T>> {
        {
            let ledger = self.ledger.lock();

            if ledger.phase != Phase::Collecting {
                return Err(Error::AlreadyFinished);
            }

            if ledger.pending == 0 {
                return Self::complete(ledger);
            }
        }

        let receiver = &self.receiver;

        loop {
            let deadline = time::deadline(&**self.config.clock(), timeout);

            select! {
                recv(receiver) -> message => {
                    let Ok(arrival) = message else {
                        unreachable!("collector keeps a sender alive");
                    };

                    let mut ledger = self.ledger.lock();
                    ledger.record(arrival);

                    if ledger.pending == 0 {
                        return Self::complete(ledger);
                    }
                }
                recv(deadline) -> _ => {
                    debug!(?timeout, "collector wait timed out");
                    return Err(Error::Timeout);
                }
            }
        }
    }

    /// Consumes the collector and returns the ordered results.
    fn complete(mut ledger: MutexGuard<'_, Ledger<T>>) -> Result<Vec<T>> {
        ledger.phase = Phase::Exhausted;

        let payload = ledger.panic.take();
        let results: Vec<T> = mem::take(&mut ledger.results)
            .into_iter()
            .flatten()
            .collect();
        drop(ledger);

        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }

        debug!(count = results.len(), "collector finished");
        Ok(results)
    }

    /// Moves the outstanding results into a background drain.
    ///
    /// Callers hold the gate, so no other thread is receiving.
    fn hand_off<C>(&self, closer: C)
    where
        C: FnMut(T) + Send + 'static,
    {
        let (received, pending) = {
            let mut ledger = self.ledger.lock();
            ledger.phase = Phase::Draining;

            if ledger.panic.take().is_some() {
                warn!("dropping panic of a drained collector task");
            }

            let received: Vec<T> = mem::take(&mut ledger.results)
                .into_iter()
                .flatten()
                .collect();
            (received, mem::take(&mut ledger.pending))
        };

        debug!(received = received.len(), pending, "collector draining");
        drain::spawn(received, pending, self.receiver.clone(), closer);
    }
}

impl<T: Send + 'static> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Collector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ledger = self.ledger.lock();

        f.debug_struct("Collector")
            .field("tasks", &ledger.tasks.len())
            .field("pending", &ledger.pending)
            .field("phase", &ledger.phase)
            .finish_non_exhaustive()
    }
}
