//! Artificial workload behind `/slow`.
//!
//! The failure draw is behind [`FaultInjector`] so tests can pin it; the CPU
//! burn itself is plain synchronous code meant to run on a blocking thread.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysinfo::System;

use reqscope_core::error::{Result, ReqScopeError};

/// Message carried by every injected failure.
pub const SYNTHETIC_FAILURE_MESSAGE: &str = "Something went wrong!";

/// Decides whether a single `/slow` request fails.
pub trait FaultInjector: Send + Sync {
    fn should_fail(&self) -> bool;
}

/// Fails with a fixed probability.
pub struct RandomFault {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl RandomFault {
    /// `seed: None` seeds from OS entropy.
    pub fn new(probability: f64, seed: Option<u64>) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ReqScopeError::BadConfig(format!(
                "failure probability must be between 0 and 1, got {probability}"
            )));
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            probability,
            rng: Mutex::new(rng),
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl FaultInjector for RandomFault {
    fn should_fail(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen::<f64>() < self.probability
    }
}

/// Always the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedFault(pub bool);

impl FaultInjector for FixedFault {
    fn should_fail(&self) -> bool {
        self.0
    }
}

/// Burn CPU: `iterations` square roots of uniform randoms.
pub fn heavy_computation(iterations: u64) -> f64 {
    let mut rng = rand::thread_rng();
    let mut acc = 0.0;
    for _ in 0..iterations {
        acc += std::hint::black_box(rng.gen::<f64>().sqrt());
    }
    acc
}

/// The `/slow` body: compute, then maybe fail.
pub fn run_slow_workload(iterations: u64, fault: &dyn FaultInjector) -> Result<()> {
    tracing::debug!(iterations, "Starting heavy computation...");
    std::hint::black_box(heavy_computation(iterations));
    if fault.should_fail() {
        return Err(ReqScopeError::SyntheticFailure(
            SYNTHETIC_FAILURE_MESSAGE.to_string(),
        ));
    }
    Ok(())
}

/// 1, 5 and 15 minute load averages. Zeros on platforms without one
/// (Windows).
pub fn load_average() -> [f64; 3] {
    let load = System::load_average();
    [load.one, load.five, load.fifteen]
}
