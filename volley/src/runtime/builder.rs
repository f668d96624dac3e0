use crate::time::{Clock, SystemClock};

use std::fmt;
use std::sync::Arc;

/// Shared configuration for tasks, collectors and runners.
///
/// A `Config` is cheap to clone; clones share the same clock.
#[derive(Clone)]
pub struct Config {
    /// Time source for every timeout.
    clock: Arc<dyn Clock>,
}

impl Config {
    /// Returns a [`ConfigBuilder`] with default settings.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Builds a config by applying `options` in order to the defaults.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use volley::time::MockClock;
    /// use volley::{Config, with_clock};
    ///
    /// let config = Config::from_options([with_clock(MockClock::new())]);
    /// ```
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        ConfigBuilder::new().apply(options).build()
    }

    /// Returns the configured clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("clock", &self.clock)
            .finish()
    }
}

/// A single configuration option, applied to a [`ConfigBuilder`].
pub type ConfigOption = Box<dyn FnOnce(&mut ConfigBuilder) + Send>;

/// Returns an option that replaces the clock with `clock`.
pub fn with_clock<C>(clock: C) -> ConfigOption
where
    C: Clock + 'static,
{
    Box::new(move |builder: &mut ConfigBuilder| {
        builder.clock = Arc::new(clock);
    })
}

/// Builder for [`Config`].
///
/// # Examples
///
/// ```rust
/// use volley::ConfigBuilder;
/// use volley::time::MockClock;
///
/// let clock = MockClock::new();
/// let config = ConfigBuilder::new()
///     .clock(clock.clone())
///     .build();
/// ```
pub struct ConfigBuilder {
    clock: Arc<dyn Clock>,
}

impl ConfigBuilder {
    /// Creates a builder using the real-time [`SystemClock`].
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for timeouts.
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Applies `options` in order. Later options override earlier ones.
    pub fn apply<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        for option in options {
            option(&mut self);
        }
        self
    }

    /// Builds the config.
    pub fn build(self) -> Config {
        Config { clock: self.clock }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
