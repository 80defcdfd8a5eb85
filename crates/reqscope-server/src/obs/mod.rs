//! Observability: request metrics, process metrics, log sinks, tracing setup.
//!
//! The metric names and bucket layout here are consumed by existing
//! dashboards and alerts; treat them as a wire contract.

pub mod log_sink;
pub mod logging;
pub mod loki;
pub mod metrics;
pub mod middleware;
pub mod process;

pub use log_sink::{FanoutSink, LogLevel, LogRecord, LogSink, MemorySink, TracingSink};
pub use loki::LokiSink;
pub use metrics::{HttpLabels, HttpMetrics, LATENCY_BUCKETS_MS};
pub use middleware::{InstrumentationLayer, InstrumentationService, RequestTimer};
pub use process::{ProcessCollector, ProcessSample};
