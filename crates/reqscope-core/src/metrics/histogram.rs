use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{fmt_value, render_labels, validate_label_name, Collector, Desc, LabelSet, MetricKind};
use crate::error::{Result, ReqScopeError};

/// Per-series storage. Counts are kept per bucket (not cumulative) so a reader
/// racing with `record` still derives a non-decreasing cumulative sequence.
struct AtomicHistogram {
    /// `bounds.len() + 1` slots; the last one is the `+Inf` overflow bucket.
    counts: Box<[AtomicU64]>,
    /// f64 bits.
    sum: AtomicU64,
}

impl AtomicHistogram {
    fn new(slots: usize) -> Self {
        Self {
            counts: (0..slots).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn record(&self, bounds: &[f64], v: f64) {
        let idx = bounds.iter().position(|&b| v <= b).unwrap_or(bounds.len());
        self.counts[idx].fetch_add(1, Ordering::Relaxed);

        let mut cur = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + v).to_bits();
            match self
                .sum
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    fn snapshot(&self) -> HistogramSnapshot {
        let mut running = 0u64;
        let cumulative = self
            .counts
            .iter()
            .map(|c| {
                running += c.load(Ordering::Relaxed);
                running
            })
            .collect::<Vec<_>>();
        HistogramSnapshot {
            count: running,
            sum: f64::from_bits(self.sum.load(Ordering::Relaxed)),
            cumulative,
        }
    }
}

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Cumulative count per bucket, in bound order, with `+Inf` last.
    pub cumulative: Vec<u64>,
    /// Equal to the `+Inf` bucket.
    pub count: u64,
    pub sum: f64,
}

/// Histogram family with fixed buckets and a typed label set.
#[derive(Clone)]
pub struct HistogramVec<L: LabelSet> {
    inner: Arc<HistogramInner<L>>,
}

struct HistogramInner<L: LabelSet> {
    desc: Desc,
    bounds: Box<[f64]>,
    map: DashMap<L, AtomicHistogram>,
}

impl<L: LabelSet> HistogramVec<L> {
    pub(crate) fn new(name: &str, help: &str, buckets: &[f64]) -> Result<Self> {
        validate_buckets(name, buckets)?;
        for label in L::names() {
            validate_label_name(label)?;
            if *label == "le" {
                return Err(ReqScopeError::InvalidMetric(format!(
                    "histogram {name} may not use the label \"le\""
                )));
            }
        }
        Ok(Self {
            inner: Arc::new(HistogramInner {
                desc: Desc::new(name, help, MetricKind::Histogram),
                bounds: buckets.into(),
                map: DashMap::new(),
            }),
        })
    }

    /// Record one observation into the series identified by `labels`.
    ///
    /// NaN is dropped. Anything at or below a bound lands in that bucket, so
    /// negative values count toward the first one.
    pub fn observe(&self, labels: &L, v: f64) {
        if v.is_nan() {
            return;
        }
        let inner = &*self.inner;
        if let Some(hist) = inner.map.get(labels) {
            hist.record(&inner.bounds, v);
            return;
        }
        let slots = inner.bounds.len() + 1;
        let hist = inner
            .map
            .entry(labels.clone())
            .or_insert_with(|| AtomicHistogram::new(slots));
        hist.record(&inner.bounds, v);
    }

    pub fn snapshot(&self, labels: &L) -> Option<HistogramSnapshot> {
        self.inner.map.get(labels).map(|h| h.snapshot())
    }

    /// Upper bounds, excluding the implicit `+Inf`.
    pub fn bounds(&self) -> &[f64] {
        &self.inner.bounds
    }

    /// Number of distinct label combinations seen so far.
    pub fn series_count(&self) -> usize {
        self.inner.map.len()
    }

    pub fn name(&self) -> &str {
        &self.inner.desc.name
    }
}

impl<L: LabelSet> Collector for HistogramVec<L> {
    fn descs(&self) -> Vec<Desc> {
        vec![self.inner.desc.clone()]
    }

    fn encode(&self, out: &mut String) {
        let inner = &*self.inner;
        let name = &inner.desc.name;
        inner.desc.encode_header(out);

        let mut series: Vec<(L, HistogramSnapshot)> = inner
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot()))
            .collect();
        series.sort_by(|a, b| a.0.values().cmp(&b.0.values()));

        let les = inner
            .bounds
            .iter()
            .map(|b| fmt_value(*b))
            .chain(std::iter::once("+Inf".to_string()))
            .collect::<Vec<_>>();
        let names = L::names();
        for (labels, snap) in &series {
            let mut pairs: Vec<(&str, &str)> = names.iter().copied().zip(labels.values()).collect();
            let base = render_labels(&pairs);

            for (le, count) in les.iter().zip(&snap.cumulative) {
                pairs.push(("le", le.as_str()));
                let _ = writeln!(out, "{}_bucket{} {}", name, render_labels(&pairs), count);
                pairs.pop();
            }
            let _ = writeln!(out, "{}_sum{} {}", name, base, fmt_value(snap.sum));
            let _ = writeln!(out, "{}_count{} {}", name, base, snap.count);
        }
    }
}

fn validate_buckets(name: &str, buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(ReqScopeError::InvalidMetric(format!(
            "histogram {name} needs at least one bucket"
        )));
    }
    if buckets.iter().any(|b| !b.is_finite()) {
        return Err(ReqScopeError::InvalidMetric(format!(
            "histogram {name} buckets must be finite (+Inf is implicit)"
        )));
    }
    if buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ReqScopeError::InvalidMetric(format!(
            "histogram {name} buckets must be strictly increasing"
        )));
    }
    Ok(())
}
