use crate::error::{Error, Result};
use crate::sync::Latch;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use tracing::{trace, warn};

use std::any::Any;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// What became of a task's result once it left the channel.
enum Outcome<T> {
    /// Nothing received yet.
    Pending,

    /// The value, cached for every later wait.
    Ready(T),

    /// The function panicked. The payload is resumed by the first waiter.
    Panicked(Option<Box<dyn Any + Send>>),

    /// The value was received and thrown away by a discard.
    Discarded,
}

/// Single-delivery result slot of a [`Task`](super::Task).
///
/// The worker sends the outcome over a rendezvous channel. Whichever
/// receiver wins (a `wait`, a `wait_for_running` or a discard) settles the
/// slot and opens `settled`, waking every other receiver so they read the
/// cached outcome instead of the channel.
pub(crate) struct Slot<T> {
    pub(crate) receiver: Receiver<thread::Result<T>>,
    outcome: Mutex<Outcome<T>>,
    pub(crate) settled: Latch,
    discarding: AtomicBool,
}

impl<T: Send + 'static> Slot<T> {
    /// Creates an empty slot and the sender its worker delivers through.
    pub(crate) fn new() -> (Self, Sender<thread::Result<T>>) {
        let (sender, receiver) = bounded(0);

        let slot = Self {
            receiver,
            outcome: Mutex::new(Outcome::Pending),
            settled: Latch::new(),
            discarding: AtomicBool::new(false),
        };

        (slot, sender)
    }

    /// Stores an outcome taken off the channel and wakes other receivers.
    pub(crate) fn settle(&self, outcome: thread::Result<T>) {
        *self.outcome.lock() = match outcome {
            Ok(value) => Outcome::Ready(value),
            Err(payload) => Outcome::Panicked(Some(payload)),
        };
        self.settled.open();
        trace!("task result settled");
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.is_open()
    }

    /// Returns the settled outcome, or `None` while still pending.
    ///
    /// A panicked task resumes its panic on the first caller.
    pub(crate) fn get(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        let mut outcome = self.outcome.lock();

        let payload = match &mut *outcome {
            Outcome::Pending => return None,
            Outcome::Ready(value) => return Some(Ok(value.clone())),
            Outcome::Discarded => return Some(Err(Error::NotExecuting)),
            Outcome::Panicked(payload) => payload.take(),
        };
        drop(outcome);

        match payload {
            Some(payload) => panic::resume_unwind(payload),
            None => panic!("task function panicked"),
        }
    }

    /// Throws the eventual result away from a background thread.
    ///
    /// Only the first call has an effect. A result already settled stays
    /// cached.
    pub(crate) fn discard(self: &Arc<Self>) {
        if self.discarding.swap(true, Ordering::AcqRel) || self.is_settled() {
            return;
        }

        let slot = self.clone();
        thread::spawn(move || {
            let settled = slot.settled.listener();

            crossbeam_channel::select! {
                recv(slot.receiver) -> message => {
                    if let Ok(outcome) = message {
                        if outcome.is_err() {
                            warn!("discarded result of a panicked task");
                        }
                        *slot.outcome.lock() = Outcome::Discarded;
                        slot.settled.open();
                        trace!("task result discarded");
                    }
                }
                recv(settled) -> _ => {}
            }
        });
    }
}
