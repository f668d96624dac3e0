//! Core runtime components.
//!
//! This module contains the building blocks of the crate:
//! - [`task`]: cancellable tasks and the handle given to their functions,
//! - `collector`: fan-out/join over many task functions,
//! - `runner`: a factory sharing one configuration,
//! - `builder`: configuration and option application,
//! - `worker`: the thread spawned for each started task.

mod worker;

pub(crate) mod builder;
pub(crate) mod collector;
pub(crate) mod runner;

pub mod task;
