use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{Collector, Desc, MetricKind};

/// Unlabeled monotonic counter. Cloning yields another handle to the same value.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    desc: Desc,
    value: AtomicU64,
}

impl Counter {
    pub(crate) fn new(name: &str, help: &str) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                desc: Desc::new(name, help, MetricKind::Counter),
                value: AtomicU64::new(0),
            }),
        }
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by an arbitrary value. There is no decrement.
    pub fn inc_by(&self, v: u64) {
        self.inner.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.inner.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.inner.desc.name
    }
}

impl Collector for Counter {
    fn descs(&self) -> Vec<Desc> {
        vec![self.inner.desc.clone()]
    }

    fn encode(&self, out: &mut String) {
        self.inner.desc.encode_header(out);
        let _ = writeln!(out, "{} {}", self.inner.desc.name, self.get());
    }
}
