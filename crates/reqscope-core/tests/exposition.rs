#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqscope_core::metrics::{LabelSet, Registry, CONTENT_TYPE};

#[derive(Clone, PartialEq, Eq, Hash)]
struct Labels {
    method: String,
    status: String,
}

impl LabelSet for Labels {
    fn names() -> &'static [&'static str] {
        &["method", "status"]
    }
    fn values(&self) -> Vec<&str> {
        vec![self.method.as_str(), self.status.as_str()]
    }
}

fn labels(method: &str, status: &str) -> Labels {
    Labels {
        method: method.into(),
        status: status.into(),
    }
}

const BUCKETS: [f64; 9] = [1.0, 50.0, 100.0, 200.0, 400.0, 500.0, 800.0, 1000.0, 2000.0];

#[test]
fn histogram_block_has_every_bound_plus_inf() {
    let reg = Registry::new();
    let h = reg
        .register_histogram::<Labels>("lat_ms", "latency", &BUCKETS)
        .unwrap();
    h.observe(&labels("GET", "200"), 75.0);

    let out = reg.collect();
    assert!(out.contains("# TYPE lat_ms histogram\n"));

    let bucket_lines: Vec<&str> = out.lines().filter(|l| l.starts_with("lat_ms_bucket")).collect();
    assert_eq!(bucket_lines.len(), 10);
    for (line, le) in bucket_lines.iter().zip([
        "1", "50", "100", "200", "400", "500", "800", "1000", "2000", "+Inf",
    ]) {
        assert!(
            line.contains(&format!("le=\"{le}\"")),
            "line {line} should carry le={le}"
        );
    }
    assert!(out.contains("lat_ms_bucket{method=\"GET\",status=\"200\",le=\"50\"} 0\n"));
    assert!(out.contains("lat_ms_bucket{method=\"GET\",status=\"200\",le=\"100\"} 1\n"));
    assert!(out.contains("lat_ms_sum{method=\"GET\",status=\"200\"} 75\n"));
    assert!(out.contains("lat_ms_count{method=\"GET\",status=\"200\"} 1\n"));
}

#[test]
fn label_values_are_escaped() {
    let reg = Registry::new();
    let h = reg.register_histogram::<Labels>("h", "h", &[1.0]).unwrap();
    h.observe(&labels("GE\"T", "a\\b\nc"), 0.5);
    let out = reg.collect();
    assert!(out.contains("h_count{method=\"GE\\\"T\",status=\"a\\\\b\\nc\"} 1\n"));
}

#[test]
fn collect_during_concurrent_recording_stays_cumulative() {
    let reg = Registry::new();
    let counter = reg.register_counter("total_req", "Tells total req").unwrap();
    let h = reg
        .register_histogram::<Labels>("lat_ms", "latency", &BUCKETS)
        .unwrap();
    let done = Arc::new(AtomicBool::new(false));

    std::thread::scope(|s| {
        for t in 0..4 {
            let counter = counter.clone();
            let h = h.clone();
            s.spawn(move || {
                for i in 0..2500u32 {
                    counter.inc();
                    h.observe(&labels("GET", "200"), f64::from((i * 7 + t) % 2500));
                }
            });
        }

        let reader_reg = reg.clone();
        let reader_done = Arc::clone(&done);
        s.spawn(move || {
            while !reader_done.load(Ordering::Relaxed) {
                let out = reader_reg.collect();
                let counts: Vec<u64> = out
                    .lines()
                    .filter(|l| l.starts_with("lat_ms_bucket"))
                    .map(|l| l.rsplit(' ').next().unwrap().parse().unwrap())
                    .collect();
                assert!(counts.windows(2).all(|w| w[0] <= w[1]), "non-cumulative: {counts:?}");
                std::thread::yield_now();
            }
        });

        // Stop the reader once every write has landed.
        s.spawn({
            let done = Arc::clone(&done);
            let counter = counter.clone();
            move || {
                while counter.get() < 10_000 {
                    std::thread::yield_now();
                }
                done.store(true, Ordering::Relaxed);
            }
        });
    });

    assert_eq!(counter.get(), 10_000);
    let snap = h.snapshot(&labels("GET", "200")).unwrap();
    assert_eq!(snap.count, 10_000);
    assert_eq!(*snap.cumulative.last().unwrap(), 10_000);
}

#[test]
fn content_type_is_prometheus_text() {
    assert_eq!(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8");
}
