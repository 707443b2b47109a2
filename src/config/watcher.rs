//! Watcher configuration: defaults, validation, and layered loading.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::event::EventType;

const DEFAULT_QUEUE_KEY: &str = "job:delayed";
const DEFAULT_JOB_SIZE: usize = 10;
const DEFAULT_CHANNEL_PATTERN: &str = "__keyevent@0__:*";
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;
const DEFAULT_GRACE_PERIOD_SECS: u64 = 10;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The underlying `config` crate failed to load or merge a source.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// The raw, partially-specified configuration as deserialized from a file or
/// environment variables, before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWatcherConfig {
    /// See [`WatcherConfig::queue_key`].
    pub queue_key: Option<String>,
    /// See [`WatcherConfig::job_size`].
    pub job_size: Option<usize>,
    /// See [`WatcherConfig::channel_pattern`].
    pub channel_pattern: Option<String>,
    /// See [`WatcherConfig::scan_interval`], in whole seconds.
    pub scan_interval_secs: Option<u64>,
    /// See [`WatcherConfig::grace_period`], in whole seconds.
    pub grace_period_secs: Option<u64>,
}

/// Validated watcher configuration.
///
/// Construct via [`WatcherConfig::default`] and [`WatcherConfig::with_callback`]
/// for in-process use, or [`WatcherConfig::load`] to layer in a TOML file and
/// `WATCHER_*` environment overrides.
#[derive(Clone)]
pub struct WatcherConfig {
    /// Name of the delayed-key index sorted set.
    pub queue_key: String,
    /// Number of concurrent subscriber workers per stream. `0` is
    /// normalized to the default of 10.
    pub job_size: usize,
    /// Pattern-subscribe expression matched against the store's
    /// keyspace-notification channels.
    pub channel_pattern: String,
    /// Compensation scanner tick interval.
    pub scan_interval: Duration,
    /// Grace window past expected expiry before the scanner treats a key as
    /// lost by the live subscriber.
    pub grace_period: Duration,
    /// User callback invoked with `(EventType, key)` per observed event.
    pub callback: Arc<dyn Fn(EventType, String) + Send + Sync>,
}

impl std::fmt::Debug for WatcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherConfig")
            .field("queue_key", &self.queue_key)
            .field("job_size", &self.job_size)
            .field("channel_pattern", &self.channel_pattern)
            .field("scan_interval", &self.scan_interval)
            .field("grace_period", &self.grace_period)
            .field("callback", &"<callback>")
            .finish()
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            job_size: DEFAULT_JOB_SIZE,
            channel_pattern: DEFAULT_CHANNEL_PATTERN.to_string(),
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            grace_period: Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS),
            callback: Arc::new(|_action, _key| {}),
        }
    }
}

impl WatcherConfig {
    /// Attach a callback, replacing the no-op default.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(EventType, String) + Send + Sync + 'static,
    {
        self.callback = Arc::new(callback);
        self
    }

    /// Apply a [`RawWatcherConfig`] on top of this configuration, normalizing
    /// boundary values (`job_size = 0` and `queue_key = ""` fall back to
    /// their defaults) per the documented boundary behaviors.
    #[must_use]
    pub fn merge(mut self, raw: RawWatcherConfig) -> Self {
        if let Some(queue_key) = raw.queue_key {
            self.queue_key = if queue_key.is_empty() {
                DEFAULT_QUEUE_KEY.to_string()
            } else {
                queue_key
            };
        }
        if let Some(job_size) = raw.job_size {
            self.job_size = if job_size == 0 { DEFAULT_JOB_SIZE } else { job_size };
        }
        if let Some(pattern) = raw.channel_pattern {
            self.channel_pattern = pattern;
        }
        if let Some(secs) = raw.scan_interval_secs {
            self.scan_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = raw.grace_period_secs {
            self.grace_period = Duration::from_secs(secs);
        }
        self
    }

    /// Load configuration by layering defaults, an optional TOML file, and
    /// `WATCHER_*`-prefixed environment variables, in that order.
    ///
    /// The returned configuration carries the default no-op callback;
    /// callers attach their own via [`WatcherConfig::with_callback`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file exists but fails to parse,
    /// or if an environment variable can't be coerced to its target type.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("WATCHER"));
        let raw: RawWatcherConfig = builder.build()?.try_deserialize()?;
        Ok(Self::default().merge(raw))
    }

    /// The channel prefix implied by [`Self::channel_pattern`], computed
    /// once so the live subscriber never re-derives it per message.
    ///
    /// For the conventional pattern `__keyevent@0__:*` this returns
    /// `__keyevent@0__:`. Patterns without a trailing `*` are used verbatim
    /// as the literal channel name, with an empty prefix.
    #[must_use]
    pub fn channel_prefix(&self) -> String {
        self.channel_pattern
            .strip_suffix('*')
            .unwrap_or(&self.channel_pattern)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = WatcherConfig::default();
        assert_eq!(config.queue_key, "job:delayed");
        assert_eq!(config.job_size, 10);
        assert_eq!(config.channel_pattern, "__keyevent@0__:*");
        assert_eq!(config.scan_interval, Duration::from_secs(10));
        assert_eq!(config.grace_period, Duration::from_secs(10));
    }

    #[test]
    fn zero_job_size_and_empty_queue_key_fall_back_to_defaults() {
        let raw = RawWatcherConfig {
            queue_key: Some(String::new()),
            job_size: Some(0),
            channel_pattern: None,
            scan_interval_secs: None,
            grace_period_secs: None,
        };
        let config = WatcherConfig::default().merge(raw);
        assert_eq!(config.queue_key, "job:delayed");
        assert_eq!(config.job_size, 10);
    }

    #[test]
    fn channel_prefix_strips_trailing_wildcard() {
        let config = WatcherConfig::default();
        assert_eq!(config.channel_prefix(), "__keyevent@0__:");
    }
}
