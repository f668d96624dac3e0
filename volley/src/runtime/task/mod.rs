//! Cancellable tasks.
//!
//! This module defines [`Task`], a unit of work executed on its own worker
//! thread, and [`TaskHandle`], the view a task function uses to observe
//! cancellation and report that it is running.
//!
//! It includes:
//! - lifecycle state management (`state`),
//! - single-delivery result slots (`slot`),
//! - the task type and its operations (`core`).

pub(crate) mod state;

mod core;
mod handle;
mod slot;

pub use core::Task;
pub use handle::TaskHandle;
