//! Operational HTTP endpoints.
//!
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use reqscope_core::metrics::CONTENT_TYPE;

use crate::app_state::AppState;

/// Rendering cannot fail: collectors write into a `String` and a source they
/// cannot read yields a sample-less block. The scrape is always a 200.
pub async fn metrics(State(state): State<AppState>) -> Response {
    state.sink().info("/metrics");
    let body = state.registry().collect();

    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}
