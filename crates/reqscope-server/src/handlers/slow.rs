//! `GET /slow`: CPU burn plus a random synthetic failure.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use reqscope_core::error::{Result, ReqScopeError};

use crate::app_state::AppState;
use crate::workload;

pub const SUCCESS_MESSAGE: &str = "Heavy computation completed successfully";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowResponse {
    pub message: &'static str,
    pub cpu_load: [f64; 3],
}

pub async fn slow(State(state): State<AppState>) -> Response {
    state.sink().info("/slow");

    match run(&state).await {
        Ok(()) => Json(SlowResponse {
            message: SUCCESS_MESSAGE,
            cpu_load: workload::load_average(),
        })
        .into_response(),
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(code = e.client_code().as_str(), "/slow failed: {message}");
            state.sink().error(&message);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {message}")).into_response()
        }
    }
}

/// Runs the workload on the blocking pool so the burn never stalls the
/// executor threads serving other requests.
async fn run(state: &AppState) -> Result<()> {
    let iterations = state.cfg().slow.iterations;
    let fault = state.fault();
    tokio::task::spawn_blocking(move || workload::run_slow_workload(iterations, fault.as_ref()))
        .await
        .map_err(|e| ReqScopeError::Internal(format!("workload task failed: {e}")))?
}
