//! Loki log shipper.
//!
//! Records are queued on a bounded channel and pushed in batches by a
//! background task, either when `batch_size` records are buffered, on every
//! `flush_interval_ms` tick, or on an explicit `flush`. A full queue drops the
//! record. Failed pushes drop their batch (no retries) and are reported by the
//! next `flush`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use reqscope_core::error::{Result, ReqScopeError};

use crate::config::LokiSection;
use crate::obs::log_sink::{LogLevel, LogRecord, LogSink};

const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

struct Entry {
    level: LogLevel,
    ts_nanos: u128,
    line: String,
}

enum Command {
    Record(Entry),
    Flush(oneshot::Sender<Result<()>>),
}

pub struct LokiSink {
    tx: mpsc::Sender<Command>,
}

impl LokiSink {
    /// Start the background shipper. Must be called within a tokio runtime.
    pub fn spawn(cfg: &LokiSection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .map_err(|e| ReqScopeError::LogShipping(format!("http client init failed: {e}")))?;

        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        let shipper = Shipper {
            client,
            push_url: cfg.push_url(),
            service: cfg.service.clone(),
            batch_size: cfg.batch_size,
            buffer: Vec::with_capacity(cfg.batch_size),
            pending_error: None,
        };
        tokio::spawn(shipper.run(rx, Duration::from_millis(cfg.flush_interval_ms)));

        tracing::info!(url = %cfg.push_url(), "loki log shipping enabled");
        Ok(Self { tx })
    }
}

#[async_trait]
impl LogSink for LokiSink {
    fn emit(&self, record: LogRecord) {
        let entry = Entry {
            level: record.level,
            ts_nanos: now_nanos(),
            line: record.line(),
        };
        match self.tx.try_send(Command::Record(entry)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("loki queue full, dropping log record");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("loki shipper stopped, dropping log record");
            }
        }
    }

    async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .await
            .map_err(|_| ReqScopeError::LogShipping("loki shipper stopped".into()))?;
        ack_rx
            .await
            .map_err(|_| ReqScopeError::LogShipping("loki shipper dropped flush".into()))?
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

// ============================================================================
// Push payload
// ============================================================================

#[derive(Serialize)]
struct PushRequest<'a> {
    streams: Vec<Stream<'a>>,
}

#[derive(Serialize)]
struct Stream<'a> {
    stream: StreamLabels<'a>,
    /// `[timestamp_nanos, line]` pairs, both strings.
    values: Vec<[String; 2]>,
}

#[derive(Serialize)]
struct StreamLabels<'a> {
    service: &'a str,
    level: &'static str,
}

fn build_payload<'a>(service: &'a str, entries: &[Entry]) -> PushRequest<'a> {
    let streams = [LogLevel::Info, LogLevel::Error]
        .into_iter()
        .filter_map(|level| {
            let values: Vec<[String; 2]> = entries
                .iter()
                .filter(|e| e.level == level)
                .map(|e| [e.ts_nanos.to_string(), e.line.clone()])
                .collect();
            (!values.is_empty()).then(|| Stream {
                stream: StreamLabels {
                    service,
                    level: level.as_str(),
                },
                values,
            })
        })
        .collect();
    PushRequest { streams }
}

// ============================================================================
// Background task
// ============================================================================

struct Shipper {
    client: reqwest::Client,
    push_url: String,
    service: String,
    batch_size: usize,
    buffer: Vec<Entry>,
    /// First failure since the last flush.
    pending_error: Option<String>,
}

impl Shipper {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>, every: Duration) {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Record(entry)) => {
                        self.buffer.push(entry);
                        if self.buffer.len() >= self.batch_size {
                            self.push().await;
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        self.push().await;
                        let res = match self.pending_error.take() {
                            Some(msg) => Err(ReqScopeError::LogShipping(msg)),
                            None => Ok(()),
                        };
                        let _ = ack.send(res);
                    }
                    None => {
                        self.push().await;
                        break;
                    }
                },
                _ = tick.tick() => self.push().await,
            }
        }
    }

    async fn push(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.buffer);
        let body = build_payload(&self.service, &entries);

        let result = self
            .client
            .post(&self.push_url)
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        if let Err(e) = result {
            tracing::warn!(error = %e, dropped = entries.len(), "loki push failed");
            self.pending_error
                .get_or_insert_with(|| format!("push to {} failed: {e}", self.push_url));
        }
    }
}
