//! Route table and server bootstrap, grounded on the teacher's
//! `build_gateway_openresponses_router` / `run_gateway_openresponses_server`
//! pair: one function assembles the `Router`, a second binds a listener and
//! serves it with graceful shutdown on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::state::GatewayState;
use crate::{actions, diagnostics, flows, runs, sessions};

pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/v1/runs", post(runs::create_run).get(runs::list_runs))
        .route("/v1/runs/:id", get(runs::get_run))
        .route("/v1/runs/:id/logs", get(runs::get_logs))
        .route("/v1/tasks/create", post(runs::create_task))
        .route("/v1/flows/price-monitor", post(flows::price_monitor))
        .route("/v1/flows/form-autofill", post(flows::form_autofill))
        .route("/v1/session/create", post(sessions::create_session))
        .route("/v1/session/close", post(sessions::close_session))
        .route("/v1/session/list", get(sessions::list_sessions))
        .route("/v1/action/goto", post(actions::goto))
        .route("/v1/action/click", post(actions::click))
        .route("/v1/action/type", post(actions::type_text))
        .route("/v1/action/waitFor", post(actions::wait_for))
        .route("/v1/action/select", post(actions::select))
        .route("/v1/action/evaluate", post(actions::evaluate))
        .route("/v1/action/screenshot", post(actions::screenshot))
        .route("/v1/action/pdf", post(actions::pdf))
        .route("/health", get(diagnostics::health))
        .route("/ready", get(diagnostics::ready))
        .route("/health/detailed", get(diagnostics::health_detailed))
        .route("/metrics", get(diagnostics::metrics))
        .with_state(state)
}

/// Binds `addr`, serves `build_router(state)` until Ctrl-C, then returns.
/// Callers that also run the idle reaper and queue worker should spawn
/// those before calling this and abort them after it returns.
pub async fn serve(state: Arc<GatewayState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "jarvis gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    info!("jarvis gateway shut down");
    Ok(())
}
