use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

/// A resettable one-way signal.
///
/// A `Latch` starts closed. Opening it disconnects every listener handed
/// out while it was closed, which makes the open event observable from a
/// blocking `recv` or from a `select!` arm alongside other channels.
///
/// Closing an open latch installs a fresh channel pair, so listeners taken
/// afterwards block again until the next `open`. Listeners taken before the
/// reset stay disconnected.
pub(crate) struct Latch {
    state: Mutex<LatchState>,
}

struct LatchState {
    /// Present while the latch is closed. Dropping it opens the latch.
    sender: Option<Sender<()>>,

    /// Listener side of the current channel pair. Nothing is ever sent on it.
    receiver: Receiver<()>,
}

impl Latch {
    /// Creates a closed latch.
    pub(crate) fn new() -> Self {
        let (sender, receiver) = bounded(0);

        Self {
            state: Mutex::new(LatchState {
                sender: Some(sender),
                receiver,
            }),
        }
    }

    /// Opens the latch.
    ///
    /// Returns `true` if this call opened it, `false` if it was already open.
    pub(crate) fn open(&self) -> bool {
        self.state.lock().sender.take().is_some()
    }

    /// Opens the latch only if `allowed` returns `true`.
    ///
    /// `allowed` runs under the latch lock, so a concurrent [`close`](Self::close)
    /// is ordered either before the check or after the open.
    pub(crate) fn open_if(&self, allowed: impl FnOnce() -> bool) -> bool {
        let mut state = self.state.lock();

        if !allowed() {
            return false;
        }
        state.sender.take().is_some()
    }

    /// Closes the latch again if it is open.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();

        if state.sender.is_none() {
            let (sender, receiver) = bounded(0);
            state.sender = Some(sender);
            state.receiver = receiver;
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.lock().sender.is_none()
    }

    /// Returns a receiver that disconnects once the latch opens.
    ///
    /// If the latch is already open, the receiver is disconnected on return.
    pub(crate) fn listener(&self) -> Receiver<()> {
        self.state.lock().receiver.clone()
    }

    /// Blocks the calling thread until the latch opens.
    pub(crate) fn wait(&self) {
        let listener = self.listener();
        let _ = listener.recv();
    }
}
