#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;

use reqscope_core::metrics::Registry;
use reqscope_server::app_state::AppState;
use reqscope_server::config::ServiceConfig;
use reqscope_server::obs::{HttpLabels, MemorySink};
use reqscope_server::router::build_router;
use reqscope_server::workload::FaultInjector;

pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub sink: Arc<MemorySink>,
}

/// Small workload, no process metrics, isolated registry.
pub fn test_config() -> ServiceConfig {
    let mut cfg = ServiceConfig::default();
    cfg.slow.iterations = 1_000;
    cfg.metrics.default_metrics = false;
    cfg
}

pub fn harness_with(cfg: ServiceConfig, fault: Arc<dyn FaultInjector>) -> Harness {
    let sink = Arc::new(MemorySink::new());
    let state = AppState::from_parts(cfg, Registry::new(), sink.clone(), fault).unwrap();
    let app = build_router(state.clone());
    Harness { app, state, sink }
}

pub fn harness(fault: Arc<dyn FaultInjector>) -> Harness {
    harness_with(test_config(), fault)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn content_type(resp: &Response<Body>) -> String {
    resp.headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn observed(state: &AppState, method: &str, route: &str, status: u16) -> u64 {
    state
        .metrics()
        .req_res_time
        .snapshot(&HttpLabels::new(method, route, status))
        .map(|s| s.count)
        .unwrap_or(0)
}
