use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use super::{validate_metric_name, Collector, Counter, HistogramVec, LabelSet};
use crate::error::{Result, ReqScopeError};

/// Content type of the text exposition format produced by [`Registry::collect`].
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Owns the set of registered collectors and renders them on demand.
///
/// Cloning yields another handle to the same registry. Registration is meant
/// for startup; `collect` may run concurrently with recording on any handle.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    names: HashSet<String>,
    collectors: Vec<Arc<dyn Collector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collector. Fails if any of its family names is malformed or
    /// already registered; in that case nothing is added.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let descs = collector.descs();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ReqScopeError::Internal("metrics registry lock poisoned".into()))?;

        let mut incoming = HashSet::new();
        for d in &descs {
            validate_metric_name(&d.name)?;
            if inner.names.contains(&d.name) || !incoming.insert(d.name.clone()) {
                return Err(ReqScopeError::DuplicateMetric(d.name.clone()));
            }
        }

        inner.names.extend(incoming);
        inner.collectors.push(collector);
        Ok(())
    }

    /// Create and register an unlabeled counter.
    pub fn register_counter(&self, name: &str, help: &str) -> Result<Counter> {
        let counter = Counter::new(name, help);
        self.register(Arc::new(counter.clone()))?;
        Ok(counter)
    }

    /// Create and register a histogram with fixed bucket upper bounds.
    pub fn register_histogram<L: LabelSet>(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
    ) -> Result<HistogramVec<L>> {
        let hist = HistogramVec::<L>::new(name, help, buckets)?;
        self.register(Arc::new(hist.clone()))?;
        Ok(hist)
    }

    /// Render every collector in registration order, one block per
    /// collector, blocks separated by a blank line.
    pub fn collect(&self) -> String {
        let collectors = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            inner.collectors.clone()
        };

        let mut out = String::new();
        for (i, c) in collectors.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            c.encode(&mut out);
        }
        out
    }

    /// Registered family names, sorted.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = inner.names.iter().cloned().collect();
        names.sort();
        names
    }
}
