//! Axum router wiring.
//!
//! The instrumentation layer is added last with `Router::layer`, which wraps
//! every route and the default 404 fallback.

use axum::{routing::get, Router};

use crate::obs::InstrumentationLayer;
use crate::{app_state::AppState, handlers, ops};

pub fn build_router(state: AppState) -> Router {
    let instrumentation = InstrumentationLayer::new(
        state.metrics().clone(),
        state.cfg().metrics.unmatched_route,
    );

    Router::new()
        .route("/", get(handlers::root))
        .route("/metrics", get(ops::metrics))
        .route("/slow", get(handlers::slow::slow))
        .with_state(state)
        .layer(instrumentation)
}
