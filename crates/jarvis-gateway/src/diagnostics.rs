//! `GET /health`, `/ready`, `/health/detailed`, `/metrics`. No third-party
//! metrics facade appears anywhere in the corpus this crate was grown
//! from, so counters here are a handful of process-local atomics exposed
//! in Prometheus text exposition format — the same shape spec.md §6 names
//! (`browser_sessions_active`, `agent_runs_total{agent,status}`, ...)
//! without pulling in a dependency nothing else in the stack uses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::GatewayState;

/// Process-local counters the gateway increments as requests flow through
/// it. Not persisted, not shared across instances — a single-process view
/// matching spec.md §6's Prometheus metric names.
#[derive(Default)]
pub struct Metrics {
    pub browser_sessions_created_total: AtomicU64,
    pub agent_runs_completed_total: AtomicU64,
    pub agent_runs_failed_total: AtomicU64,
    pub queue_jobs_enqueued_total: AtomicU64,
}

impl Metrics {
    pub fn record_session_created(&self) {
        self.browser_sessions_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_completed(&self) {
        self.agent_runs_completed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_failed(&self) {
        self.agent_runs_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_enqueued(&self) {
        self.queue_jobs_enqueued_total.fetch_add(1, Ordering::Relaxed);
    }
}

pub async fn health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Readiness additionally checks that the session pool, if configured,
/// still has room to admit at least one more session — a gateway with a
/// fully saturated browser backend is up but not ready to take more work.
pub async fn ready(State(state): State<Arc<GatewayState>>) -> Response {
    if let Some(manager) = state.session_manager.as_deref() {
        if manager.permits_available() == 0 {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "saturated" }))).into_response();
        }
    }
    (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
}

pub async fn health_detailed(State(state): State<Arc<GatewayState>>) -> Response {
    let sessions = match state.session_manager.as_deref() {
        Some(manager) => json!({
            "active": manager.active_count().await,
            "max_concurrent": manager.max_concurrent(),
            "permits_available": manager.permits_available(),
        }),
        None => json!(null),
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "registered_agents": state.orchestrator.registered_agent_ids(),
            "browser_sessions": sessions,
        })),
    )
        .into_response()
}

pub async fn metrics(State(state): State<Arc<GatewayState>>) -> Response {
    let sessions_active = match state.session_manager.as_deref() {
        Some(manager) => manager.active_count().await as u64,
        None => 0,
    };
    let m = &state.metrics;

    let body = format!(
        "# HELP browser_sessions_active Number of browser sessions currently leased.\n\
         # TYPE browser_sessions_active gauge\n\
         browser_sessions_active {sessions_active}\n\
         # HELP browser_sessions_created_total Total browser sessions ever created.\n\
         # TYPE browser_sessions_created_total counter\n\
         browser_sessions_created_total {created}\n\
         # HELP agent_runs_total Total agent runs by terminal outcome.\n\
         # TYPE agent_runs_total counter\n\
         agent_runs_total{{status=\"completed\"}} {completed}\n\
         agent_runs_total{{status=\"failed\"}} {failed}\n\
         # HELP queue_job_total Total jobs enqueued onto the async job queue.\n\
         # TYPE queue_job_total counter\n\
         queue_job_total{{status=\"enqueued\"}} {enqueued}\n",
        sessions_active = sessions_active,
        created = m.browser_sessions_created_total.load(Ordering::Relaxed),
        completed = m.agent_runs_completed_total.load(Ordering::Relaxed),
        failed = m.agent_runs_failed_total.load(Ordering::Relaxed),
        enqueued = m.queue_jobs_enqueued_total.load(Ordering::Relaxed),
    );

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}
