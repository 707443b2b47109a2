//! # Redis Keyspace Watcher
//!
//! A reliable keyspace-event watcher over Redis (or a Redis-compatible,
//! possibly sharded, store) that delivers each tracked key's terminal event
//! **at least once** by combining a live pub/sub stream with a periodic scan
//! of a persisted delayed-key index.
//!
//! ## Core Problem Solved
//!
//! Redis keyspace notifications are delivered best-effort: a client
//! disconnect, subscriber overflow, or server restart silently drops
//! messages. This crate layers a compensation scanner on top of the live
//! subscription so a dropped notification is still eventually observed, at
//! the cost of occasional duplicate delivery (callbacks must be idempotent).
//!
//! ## Key Features
//!
//! - **At-least-once delivery**: live pub/sub plus a grace-windowed
//!   compensation scan of a persisted delayed-key index.
//! - **Worker-pool kernel**: bounded-concurrency async tasks with graceful
//!   shutdown and optional panic recovery.
//! - **Pluggable store**: single-node or sharded, behind one trait.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use redis_keyspace_watcher::config::WatcherConfig;
//! use redis_keyspace_watcher::store::redis::RedisStore;
//! use redis_keyspace_watcher::watcher::Watcher;
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! let config = WatcherConfig::default().with_callback(|action, key| {
//!     println!("{action:?} {key}");
//! });
//! let watcher = Watcher::new(store, config).await?;
//! watcher.register("session:42", "payload", Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! For a complete, runnable example see `demos/watch-keys`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Worker-pool and periodic-job concurrency kernel.
pub mod core;
/// Typed, validated configuration for the watcher.
pub mod config;
/// Event model shared by the live subscriber and the compensation scanner.
pub mod event;
/// The delayed-key index protocol layered on top of a `StoreAdapter`.
pub mod index;
/// Compensation scanner: sweeps the delayed-key index for overdue entries.
pub mod scanner;
/// Store adapter trait and its Redis-backed implementations.
pub mod store;
/// Live subscriber: consumes keyspace notifications and dispatches callbacks.
pub mod subscriber;
/// Shared utilities (clock, telemetry).
pub mod util;
/// Public orchestrator composing the subsystems above.
pub mod watcher;

pub use config::WatcherConfig;
pub use event::{Event, EventType};
pub use watcher::{Watcher, WatcherError};

