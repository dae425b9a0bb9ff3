//! Log output setup.
//!
//! The engine only emits `tracing` events; nothing is printed unless the
//! application installs a subscriber. [`TracingConfig`] installs a
//! `tracing-subscriber` registry with an [`EnvFilter`] and the fmt layer:
//!
//! ```rust,ignore
//! TracingConfig::new()
//!     .with_env_filter("wayfare=debug,wayfare_std=trace")
//!     .try_init();
//! ```

use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    level: Level,
    env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingConfig {
    /// `INFO` and above, no custom filter.
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            env_filter: None,
        }
    }

    /// Sets the fallback level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets a filter directive string, e.g. `wayfare=debug`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str());
        match &self.env_filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| fallback()),
            None => fallback(),
        }
    }

    /// Install the global subscriber.
    ///
    /// Returns `false` when one is already installed.
    pub fn try_init(&self) -> bool {
        tracing_subscriber::registry()
            .with(self.filter())
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        let config = TracingConfig::new().with_env_filter("wayfare=debug");
        config.try_init();
        assert!(!config.try_init());
    }

    #[test]
    fn test_bad_filter_falls_back_to_level() {
        let config = TracingConfig::new()
            .with_level(Level::WARN)
            .with_env_filter("wayfare=loud");
        assert_eq!(
            config.filter().max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::WARN)
        );
    }
}
