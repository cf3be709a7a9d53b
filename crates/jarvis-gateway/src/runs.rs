//! `/v1/runs*` and the legacy `/v1/tasks/create` alias. Each handler
//! deserializes a request, calls exactly one orchestrator operation, and
//! serializes either the run or the uniform error shape — no business
//! logic here, per the crate's one job (spec.md §6 / SPEC_FULL.md §10.6).

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jarvis_model::{AgentKind, Run, RunId};
use jarvis_orchestrator::RunInput;

use crate::auth::owner_from_bearer;
use crate::error::{idempotency_key_from_headers, ApiError};
use crate::state::GatewayState;

fn run_id_from_path(raw: &str, method: &str, path: &str) -> Result<RunId, ApiError> {
    RunId::from_str(raw).map_err(|_| ApiError::bad_request("validation_error", format!("invalid run id '{raw}'"), method, path))
}

pub async fn create_run(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(input): Json<RunInput>) -> Response {
    let method = "POST";
    let path = "/v1/runs";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let idempotency_key = match idempotency_key_from_headers(&headers, method, path) {
        Ok(key) => key,
        Err(error) => return error.into_response(),
    };

    match state.orchestrator.create_run(&owner, input, idempotency_key.as_deref()).await {
        Ok(admission) => {
            let status = if admission.replayed {
                StatusCode::OK
            } else if admission.run.is_async {
                StatusCode::ACCEPTED
            } else {
                StatusCode::OK
            };
            (status, Json(admission.run)).into_response()
        }
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

/// Legacy alias: same request shape, always `201` on success (no
/// idempotency replay semantics — spec.md §6 lists this route separately
/// from `/v1/runs` with its own success code).
pub async fn create_task(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(input): Json<RunInput>) -> Response {
    let method = "POST";
    let path = "/v1/tasks/create";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };

    match state.orchestrator.create_run(&owner, input, None).await {
        Ok(admission) => (StatusCode::CREATED, Json(admission.run)).into_response(),
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

pub async fn get_run(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Path(run_id): Path<String>) -> Response {
    let method = "GET";
    let path = "/v1/runs/:id";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let run_id = match run_id_from_path(&run_id, method, path) {
        Ok(id) => id,
        Err(error) => return error.into_response(),
    };

    match state.orchestrator.get_run(run_id, &owner) {
        Ok(run) => (StatusCode::OK, Json(run)).into_response(),
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

#[derive(serde::Deserialize)]
pub struct ListRunsQuery {
    #[serde(default)]
    agent_kind: Option<AgentKind>,
}

pub async fn list_runs(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Query(query): Query<ListRunsQuery>) -> Response {
    let method = "GET";
    let path = "/v1/runs";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };

    let runs: Vec<Run> = match query.agent_kind {
        Some(kind) => state.orchestrator.list_runs_by_agent(kind, &owner),
        None => state.orchestrator.list_runs(&owner),
    };
    (StatusCode::OK, Json(runs)).into_response()
}

#[derive(serde::Deserialize)]
pub struct LogsQuery {
    cursor: Option<String>,
    limit: Option<usize>,
}

const DEFAULT_LOGS_PAGE_SIZE: usize = 50;

pub async fn get_logs(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let method = "GET";
    let path = "/v1/runs/:id/logs";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let run_id = match run_id_from_path(&run_id, method, path) {
        Ok(id) => id,
        Err(error) => return error.into_response(),
    };

    let limit = query.limit.unwrap_or(DEFAULT_LOGS_PAGE_SIZE);
    match state.orchestrator.get_logs(run_id, &owner, query.cursor.as_deref(), limit) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

