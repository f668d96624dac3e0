//! Synchronization primitives used internally by tasks and collectors.
//!
//! The only primitive so far is [`Latch`], a resettable signal built on a
//! channel disconnect. It lets "running", "stopping" and "result settled"
//! events take part in a `select!` next to result and timer channels.

mod latch;

pub(crate) use latch::Latch;
