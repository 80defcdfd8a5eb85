//! reqscope server binary.
//!
//! - `GET /`        : welcome text
//! - `GET /metrics` : Prometheus scrape
//! - `GET /slow`    : CPU burn with a 10% synthetic failure
//!
//! Every completed request is counted and timed by the instrumentation layer.

use reqscope_core::error::{Result, ReqScopeError};
use reqscope_server::{app_state, build_log_sink, config, obs, router};

#[tokio::main]
async fn main() -> Result<()> {
    let (cfg, source) = config::load()?;
    obs::logging::init_tracing(cfg.logging.format);
    match &source {
        Some(path) => tracing::info!(%path, "config loaded"),
        None => tracing::info!("no config file, using defaults"),
    }

    let listen = cfg.server.listen_addr()?;
    let sink = build_log_sink(&cfg.logging)?;
    let state = app_state::AppState::new(cfg, sink.clone())?;
    tracing::info!(metrics = ?state.registry().names(), "metrics registered");
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ReqScopeError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "Server started on port {}", listen.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ReqScopeError::Internal(format!("server failed: {e}")))?;

    if let Err(e) = sink.flush().await {
        tracing::warn!(code = e.client_code().as_str(), error = %e, "log sink flush failed");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
