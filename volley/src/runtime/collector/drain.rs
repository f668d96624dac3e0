use super::Arrival;

use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Hands every outstanding result of a timed-out collector to `closer`.
///
/// `received` holds the results that arrived before the timeout; they are
/// closed first. The drain then keeps receiving until `pending` more
/// arrivals have been consumed, so no worker stays blocked on its send.
/// A panicking `closer` is logged and the drain carries on.
pub(super) fn spawn<T, C>(
    received: Vec<T>,
    pending: usize,
    receiver: Receiver<Arrival<T>>,
    closer: C,
) where
    T: Send + 'static,
    C: FnMut(T) + Send + 'static,
{
    thread::spawn(move || run(received, pending, &receiver, closer));
}

fn run<T, C>(
    received: Vec<T>,
    mut pending: usize,
    receiver: &Receiver<Arrival<T>>,
    mut closer: C,
) where
    C: FnMut(T),
{
    for value in received {
        close(&mut closer, value);
    }

    while pending > 0 {
        let Ok(arrival) = receiver.recv() else {
            break;
        };
        pending -= 1;

        match arrival.outcome {
            Ok(value) => close(&mut closer, value),
            Err(_) => warn!(index = arrival.index, "drained result of a panicked task"),
        }
    }

    debug!("collector drain finished");
}

fn close<T, C>(closer: &mut C, value: T)
where
    C: FnMut(T),
{
    if panic::catch_unwind(AssertUnwindSafe(|| closer(value))).is_err() {
        warn!("collector closer panicked");
    }
}
