//! # Middleware Stack
//!
//! Tower middleware for the service API:
//! - [`tracing_layer`]: request/response spans with `TraceLayer`.
//! - [`metrics`]: Prometheus request metrics and registry gauges.

pub mod metrics;
pub mod tracing_layer;
