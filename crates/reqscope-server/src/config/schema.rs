use std::net::SocketAddr;

use serde::Deserialize;
use reqscope_core::error::{Result, ReqScopeError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub slow: SlowSection,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            logging: LoggingSection::default(),
            metrics: MetricsSection::default(),
            slow: SlowSection::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ReqScopeError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.logging.validate()?;
        self.slow.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            ReqScopeError::BadConfig(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:4000".into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,

    /// Remote log shipping; disabled when absent.
    #[serde(default)]
    pub loki: Option<LokiSection>,
}

impl LoggingSection {
    pub fn validate(&self) -> Result<()> {
        match &self.loki {
            Some(loki) => loki.validate(),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LokiSection {
    /// Base URL, e.g. `http://127.0.0.1:3100`.
    pub url: String,

    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl LokiSection {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service: default_service(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ReqScopeError::BadConfig(
                "logging.loki.url must start with http:// or https://".into(),
            ));
        }
        if self.service.is_empty() {
            return Err(ReqScopeError::BadConfig(
                "logging.loki.service must not be empty".into(),
            ));
        }
        if !(1..=10_000).contains(&self.batch_size) {
            return Err(ReqScopeError::BadConfig(
                "logging.loki.batch_size must be between 1 and 10000".into(),
            ));
        }
        if !(100..=60_000).contains(&self.flush_interval_ms) {
            return Err(ReqScopeError::BadConfig(
                "logging.loki.flush_interval_ms must be between 100 and 60000".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ReqScopeError::BadConfig(
                "logging.loki.queue_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Push endpoint derived from the base URL.
    pub fn push_url(&self) -> String {
        format!("{}/loki/api/v1/push", self.url.trim_end_matches('/'))
    }
}

fn default_service() -> String {
    "reqscope".into()
}
fn default_batch_size() -> usize {
    100
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_queue_capacity() -> usize {
    4096
}

/// Route label used when no route pattern matched the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedRoute {
    /// Raw request path. Every distinct unknown path becomes its own series.
    #[default]
    Raw,
    /// A single `<unmatched>` series.
    Collapsed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Register process CPU / memory / start-time metrics.
    #[serde(default = "default_true")]
    pub default_metrics: bool,

    #[serde(default)]
    pub unmatched_route: UnmatchedRoute,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            default_metrics: true,
            unmatched_route: UnmatchedRoute::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlowSection {
    #[serde(default = "default_iterations")]
    pub iterations: u64,

    #[serde(default = "default_failure_probability")]
    pub failure_probability: f64,

    /// Fixed RNG seed for the failure draw; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SlowSection {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            failure_probability: default_failure_probability(),
            seed: None,
        }
    }
}

impl SlowSection {
    pub fn validate(&self) -> Result<()> {
        if self.iterations > 1_000_000_000 {
            return Err(ReqScopeError::BadConfig(
                "slow.iterations must be at most 1000000000".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ReqScopeError::BadConfig(
                "slow.failure_probability must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_iterations() -> u64 {
    10_000_000
}
fn default_failure_probability() -> f64 {
    0.1
}
