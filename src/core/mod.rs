//! Worker-pool and periodic-job concurrency kernel.
//!
//! These two types are the hosting mechanism for both the live subscriber
//! and the compensation scanner: a [`Pool`] provides bounded-concurrency
//! task execution with graceful shutdown, and a [`Job`] repeatedly runs a
//! task body on a fixed number of pool workers, either immediately-looping
//! or paced by an interval.

pub mod error;
pub mod job;
pub mod pool;

pub use error::PoolError;
pub use job::Job;
pub use pool::Pool;
