//! Telemetry and logging infrastructure
//!
//! Structured logging with tracing and fetch timing metrics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogFormat, LogGuard};
pub use metrics::{FetchMetrics, FetchOutcome, OperationKind, OperationStats};
