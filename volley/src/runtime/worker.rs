use crate::runtime::task::TaskHandle;
use crate::runtime::task::state::Signals;

use tracing::{trace, warn};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Spawns the worker thread executing one task function.
///
/// The worker:
/// 1. calls `func` with a [`TaskHandle`] bound to `signals`,
/// 2. marks the task finished (clearing the running flag),
/// 3. hands the outcome to `deliver`.
///
/// A panic inside `func` is caught and delivered as `Err(payload)` so that
/// whoever receives the outcome can resume it on its own thread.
/// `deliver` typically blocks on a rendezvous send until a receiver takes
/// the outcome or every receiver is gone.
pub(crate) fn spawn<T, F, D>(signals: Arc<Signals>, func: F, deliver: D)
where
    T: Send + 'static,
    F: FnOnce(&TaskHandle) -> T + Send + 'static,
    D: FnOnce(thread::Result<T>) + Send + 'static,
{
    thread::spawn(move || {
        let handle = TaskHandle::new(signals.clone());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| func(&handle)));
        if outcome.is_err() {
            warn!("task function panicked");
        }

        signals.finish();
        trace!("task function returned");

        deliver(outcome);
    });
}
