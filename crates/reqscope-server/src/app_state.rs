//! Shared application state.
//!
//! Everything that outlives a request lives here and is injected explicitly:
//! the metrics registry, the request metric handles, the log sink and the
//! fault injector. Construction registers all metrics, so a naming clash
//! fails startup before the listener is bound.

use std::sync::Arc;

use reqscope_core::error::Result;
use reqscope_core::metrics::Registry;

use crate::config::ServiceConfig;
use crate::obs::{HttpMetrics, LogSink, ProcessCollector};
use crate::workload::{FaultInjector, RandomFault};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    registry: Registry,
    metrics: HttpMetrics,
    sink: Arc<dyn LogSink>,
    fault: Arc<dyn FaultInjector>,
}

impl AppState {
    /// Fresh registry, fault injector from `cfg.slow`.
    pub fn new(cfg: ServiceConfig, sink: Arc<dyn LogSink>) -> Result<Self> {
        let fault = Arc::new(RandomFault::new(
            cfg.slow.failure_probability,
            cfg.slow.seed,
        )?);
        tracing::debug!(
            probability = fault.probability(),
            seeded = cfg.slow.seed.is_some(),
            "slow fault injector ready"
        );
        Self::from_parts(cfg, Registry::new(), sink, fault)
    }

    /// Build from explicit collaborators. The registry may already hold
    /// metrics; a name clash with the ones registered here is an error.
    pub fn from_parts(
        cfg: ServiceConfig,
        registry: Registry,
        sink: Arc<dyn LogSink>,
        fault: Arc<dyn FaultInjector>,
    ) -> Result<Self> {
        if cfg.metrics.default_metrics {
            registry.register(Arc::new(ProcessCollector::new()))?;
        }
        let metrics = HttpMetrics::register(&registry)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
                sink,
                fault,
            }),
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.inner.metrics
    }

    pub fn sink(&self) -> &dyn LogSink {
        self.inner.sink.as_ref()
    }

    pub fn fault(&self) -> Arc<dyn FaultInjector> {
        Arc::clone(&self.inner.fault)
    }
}
