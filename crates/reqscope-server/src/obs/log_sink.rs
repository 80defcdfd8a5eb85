//! Structured event sinks used by the endpoint handlers.
//!
//! Handlers never talk to a global logger: they receive an `Arc<dyn LogSink>`
//! through `AppState`. `emit` is fire-and-forget and must not block or fail the
//! request path; delivery problems surface from `flush`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use reqscope_core::error::Result;

/// Tracing target for endpoint events emitted by [`TracingSink`].
pub const EVENT_TARGET: &str = "reqscope::events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
        }
    }

    /// Shipped line: info events are the object `{"message": ...}`, error
    /// events the bare message.
    pub fn line(&self) -> String {
        match self.level {
            LogLevel::Info => json!({ "message": self.message }).to_string(),
            LogLevel::Error => self.message.clone(),
        }
    }
}

#[async_trait]
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);

    /// Deliver anything buffered. Called once at shutdown.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn info(&self, message: &str) {
        self.emit(LogRecord::info(message));
    }

    fn error(&self, message: &str) {
        self.emit(LogRecord::error(message));
    }
}

/// Writes events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        match record.level {
            LogLevel::Info => tracing::info!(target: EVENT_TARGET, "{}", record.line()),
            LogLevel::Error => tracing::error!(target: EVENT_TARGET, "{}", record.line()),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Sends every record to each inner sink.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl LogSink for FanoutSink {
    fn emit(&self, record: LogRecord) {
        for sink in &self.sinks {
            sink.emit(record.clone());
        }
    }

    /// Flushes every sink; the first error wins.
    async fn flush(&self) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.flush().await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
