//! Minimal metrics registry with Prometheus text exposition.
//!
//! Metric handles (`Counter`, `HistogramVec`) are created through a
//! [`Registry`], so every handle in circulation refers to a registered metric.
//! Series are keyed by typed [`LabelSet`]s and stored in `DashMap`s of atomics;
//! rendering sorts series by label values so scrape output is deterministic.

mod counter;
mod histogram;
mod registry;

use std::fmt::Write;
use std::hash::Hash;

use crate::error::{Result, ReqScopeError};

pub use counter::Counter;
pub use histogram::{HistogramSnapshot, HistogramVec};
pub use registry::{Registry, CONTENT_TYPE};

/// Metric type as written on the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Static description of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
}

impl Desc {
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
        }
    }

    /// Write the `# HELP` / `# TYPE` header for this family.
    pub fn encode_header(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(out, "# TYPE {} {}", self.name, self.kind.as_str());
    }
}

/// Anything the registry can aggregate into a scrape.
///
/// A collector may expose several families (the process collector does);
/// every name returned by `descs` takes part in the registry's uniqueness check.
pub trait Collector: Send + Sync {
    fn descs(&self) -> Vec<Desc>;
    /// Append complete blocks (header plus samples) for every family, each
    /// block terminated by a newline.
    fn encode(&self, out: &mut String);
}

/// A fixed, ordered set of labels identifying one series.
///
/// Implementors decide the label names once (at type level), which keeps the
/// label schema of a metric immutable after registration.
pub trait LabelSet: Clone + Eq + Hash + Send + Sync + 'static {
    fn names() -> &'static [&'static str];
    fn values(&self) -> Vec<&str>;
}

impl LabelSet for () {
    fn names() -> &'static [&'static str] {
        &[]
    }

    fn values(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Helper to escape label values.
pub(crate) fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value the way Prometheus clients do (`50`, `12.5`, `+Inf`).
pub(crate) fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // f64 Display is the shortest round-trip form and drops a zero fraction.
        format!("{v}")
    }
}

/// Render `{k="v",...}` for the given pairs; empty string when there are none.
pub(crate) fn render_labels(pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{body}}}")
}

pub(crate) fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':');
    let ok_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if ok_first && ok_rest {
        Ok(())
    } else {
        Err(ReqScopeError::InvalidMetric(format!("invalid metric name: {name:?}")))
    }
}

pub(crate) fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let ok_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok_first && ok_rest && !name.starts_with("__") {
        Ok(())
    } else {
        Err(ReqScopeError::InvalidMetric(format!("invalid label name: {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_formatting() {
        assert_eq!(fmt_value(50.0), "50");
        assert_eq!(fmt_value(12.5), "12.5");
        assert_eq!(fmt_value(0.0), "0");
        assert_eq!(fmt_value(f64::INFINITY), "+Inf");
    }

    #[test]
    fn label_rendering_escapes() {
        assert_eq!(render_labels(&[]), "");
        assert_eq!(
            render_labels(&[("route", "/a\"b"), ("method", "GET")]),
            "{route=\"/a\\\"b\",method=\"GET\"}"
        );
    }

    #[test]
    fn name_validation() {
        assert!(validate_metric_name("total_req").is_ok());
        assert!(validate_metric_name("ns:sub_total").is_ok());
        assert!(validate_metric_name("1bad").is_err());
        assert!(validate_metric_name("").is_err());
        assert!(validate_metric_name("with-dash").is_err());

        assert!(validate_label_name("status_code").is_ok());
        assert!(validate_label_name("__reserved").is_err());
        assert!(validate_label_name("a:b").is_err());
    }
}
