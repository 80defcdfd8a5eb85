//! reqscope server library entry.
//!
//! Wires config, shared state, endpoint handlers and the request
//! instrumentation layer into an axum router. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod handlers;
pub mod obs;
pub mod ops;
pub mod router;
pub mod workload;

use std::sync::Arc;

use reqscope_core::error::Result;

use crate::config::LoggingSection;
use crate::obs::{FanoutSink, LogSink, LokiSink, TracingSink};

/// Build the event sink described by `logging`: tracing always, plus Loki
/// when configured. Must be called within a tokio runtime.
pub fn build_log_sink(logging: &LoggingSection) -> Result<Arc<dyn LogSink>> {
    match &logging.loki {
        None => Ok(Arc::new(TracingSink)),
        Some(loki) => {
            let loki: Arc<dyn LogSink> = Arc::new(LokiSink::spawn(loki)?);
            let tracing_sink: Arc<dyn LogSink> = Arc::new(TracingSink);
            Ok(Arc::new(FanoutSink::new(vec![tracing_sink, loki])))
        }
    }
}
