//! Typed, validated configuration for the watcher.
//!
//! Configuration loads in three layers, each overriding the previous:
//! built-in defaults, an optional TOML file, and `WATCHER_*`-prefixed
//! environment variables — the same defaults-then-file-then-env shape this
//! lineage of crates uses for its scheduler configuration, generalized from
//! a single JSON blob to the `config` crate's layered sources.

pub mod watcher;

pub use watcher::{ConfigError, RawWatcherConfig, WatcherConfig};
