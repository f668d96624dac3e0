//! Clock abstraction used for every timeout.
//!
//! This module provides:
//! - [`Clock`], the injected time source with `after(duration)` semantics,
//! - [`SystemClock`], the real-time implementation used by default,
//! - [`MockClock`], a manually advanced virtual clock for deterministic tests.
//!
//! A clock is installed through [`ConfigBuilder::clock`](crate::ConfigBuilder::clock).

mod clock;
mod mock;
mod timer;

#[doc(inline)]
pub use clock::{Clock, SystemClock, Wakeup};

#[doc(inline)]
pub use mock::MockClock;

use std::time::Duration;

/// Returns the wakeup bounding a wait of `timeout`.
///
/// A zero timeout means "wait forever" and yields a receiver that never fires.
pub(crate) fn deadline(clock: &dyn Clock, timeout: Duration) -> Wakeup {
    if timeout.is_zero() {
        crossbeam_channel::never()
    } else {
        clock.after(timeout)
    }
}
