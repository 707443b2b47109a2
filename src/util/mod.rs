//! Small cross-cutting helpers: telemetry setup and a clock seam for tests.

pub mod clock;
pub mod telemetry;

pub use clock::now_ms;
pub use telemetry::init_tracing;
