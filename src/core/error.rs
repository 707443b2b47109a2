//! Error types for the worker-pool kernel.

use thiserror::Error;

/// Errors produced by [`super::Pool`] and [`super::Job`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// `submit` was called after `close()`.
    #[error("pool closed")]
    Closed,
}
