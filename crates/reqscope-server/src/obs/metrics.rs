//! Request metrics recorded by the instrumentation middleware.

use reqscope_core::error::Result;
use reqscope_core::metrics::{Counter, HistogramVec, LabelSet, Registry};

pub const TOTAL_REQ_NAME: &str = "total_req";
pub const TOTAL_REQ_HELP: &str = "Tells total req";

pub const REQ_RES_TIME_NAME: &str = "http_express_req_res_time";
pub const REQ_RES_TIME_HELP: &str = "Histogram of HTTP request response time in ms";

/// Latency bucket upper bounds in milliseconds (`+Inf` is implicit).
pub const LATENCY_BUCKETS_MS: [f64; 9] = [1.0, 50.0, 100.0, 200.0, 400.0, 500.0, 800.0, 1000.0, 2000.0];

/// Labels of one latency series: `{method, route, status_code}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpLabels {
    pub method: String,
    pub route: String,
    pub status_code: String,
}

impl HttpLabels {
    pub fn new(method: impl Into<String>, route: impl Into<String>, status: u16) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
            status_code: status.to_string(),
        }
    }
}

impl LabelSet for HttpLabels {
    fn names() -> &'static [&'static str] {
        &["method", "route", "status_code"]
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.method.as_str(),
            self.route.as_str(),
            self.status_code.as_str(),
        ]
    }
}

/// Handles to the two request metrics.
#[derive(Clone)]
pub struct HttpMetrics {
    pub total_req: Counter,
    pub req_res_time: HistogramVec<HttpLabels>,
}

impl HttpMetrics {
    /// Register both metrics. A name clash is a startup error.
    pub fn register(registry: &Registry) -> Result<Self> {
        let req_res_time = registry.register_histogram::<HttpLabels>(
            REQ_RES_TIME_NAME,
            REQ_RES_TIME_HELP,
            &LATENCY_BUCKETS_MS,
        )?;
        let total_req = registry.register_counter(TOTAL_REQ_NAME, TOTAL_REQ_HELP)?;
        Ok(Self {
            total_req,
            req_res_time,
        })
    }

    /// Record one completed request.
    pub fn record(&self, labels: &HttpLabels, elapsed_ms: f64) {
        self.total_req.inc();
        self.req_res_time.observe(labels, elapsed_ms);
    }
}
