use super::builder::Config;
use super::collector::Collector;
use super::task::{Task, TaskHandle};

/// A factory for tasks and collectors sharing one configuration.
///
/// `Runner` is useful when many independent one-off tasks need the same
/// clock, for example a [`MockClock`](crate::time::MockClock) in tests.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use volley::Runner;
///
/// let runner = Runner::default();
/// let task = runner.run(|_| 42);
///
/// assert_eq!(task.wait(Duration::from_secs(1)), Ok(42));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Creates a runner handing `config` to everything it builds.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the shared configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a task running `func` without starting it.
    pub fn task<T, F>(&self, func: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        Task::with_config(&self.config, func)
    }

    /// Creates a task running `func` and starts it immediately.
    pub fn run<T, F>(&self, func: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce(&TaskHandle) -> T + Send + 'static,
    {
        let task = self.task(func);

        // A task that was never started always starts.
        let started = task.start();
        debug_assert!(started.is_ok());

        task
    }

    /// Creates an empty collector using the shared configuration.
    pub fn collector<T>(&self) -> Collector<T>
    where
        T: Send + 'static,
    {
        Collector::with_config(self.config.clone())
    }
}
