//! # Volley
//!
//! **Volley** is a small concurrency-coordination library for the **Nebula**
//! ecosystem. It launches independent units of work on their own threads,
//! lets the caller observe and control their lifecycle, and joins many of
//! them into a single ordered result set.
//!
//! It offers:
//!
//! - [`Task`]: a cancellable unit of work with cooperative stopping, a
//!   user-declared running phase, and a result delivered exactly once and
//!   cached for every later wait
//! - [`Collector`]: a fan-out/join aggregator returning results in
//!   submission order, with per-arrival timeouts and a background drain
//!   that hands stragglers to a closer instead of leaking their workers
//! - [`Runner`]: a factory creating tasks and collectors with one shared
//!   [`Config`]
//! - [`time::MockClock`]: a virtual clock for deterministic timeout tests
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use volley::{Collector, Task};
//!
//! // A task that runs until asked to stop
//! let task = Task::new(|handle| {
//!     handle.set_running(true);
//!     handle.wait_for_stop();
//!     "done"
//! });
//!
//! task.start().unwrap();
//! task.wait_for_running(Duration::from_secs(1)).unwrap();
//! assert_eq!(task.stop_and_wait(Duration::from_secs(1)), Ok("done"));
//!
//! // Three functions joined in submission order
//! let collector = Collector::new();
//! for n in [3, 1, 2] {
//!     collector.run(move |_| n).unwrap();
//! }
//! assert_eq!(collector.wait(Duration::from_secs(1)), Ok(vec![3, 1, 2]));
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Task and TaskHandle
//! - [`time`]: Clock abstraction, system clock and mock clock

mod error;
mod runtime;
mod sync;

pub mod time;

pub use error::{Error, Result};
pub use runtime::builder::{Config, ConfigBuilder, ConfigOption, with_clock};
pub use runtime::collector::Collector;
pub use runtime::runner::Runner;
pub use runtime::task::{self, Task, TaskHandle};
