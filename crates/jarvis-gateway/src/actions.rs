//! `/v1/action/{goto,click,type,waitFor,select,evaluate,screenshot,pdf}`.
//! One thin handler per action: deserialize the body into an
//! `ActionRequest`, hand it to the Action Engine, serialize the result.
//! Byte payloads (`screenshot`/`pdf`) are base64-encoded into the JSON
//! `data` field rather than returned as a raw body, matching how
//! `ActionResult::data` already carries them from `jarvis-browser`.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jarvis_model::{ActionKind, ActionRequest, SessionId};
use serde::Deserialize;

use crate::auth::owner_from_bearer;
use crate::error::ApiError;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    pub session_id: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

async fn execute(state: &GatewayState, headers: &HeaderMap, path: &'static str, kind: ActionKind, body: ActionBody) -> Response {
    let method = "POST";
    let owner = match owner_from_bearer(headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let session_id = match SessionId::from_str(&body.session_id) {
        Ok(id) => id,
        Err(_) => return ApiError::bad_request("validation_error", "invalid session id", method, path).into_response(),
    };
    let Some(engine) = state.action_engine() else {
        return ApiError::from_jarvis(
            jarvis_model::JarvisError::ExternalService("no browser backend configured".to_string()),
            method,
            path,
        )
        .into_response();
    };

    let request = ActionRequest {
        session_id,
        kind,
        target: body.target,
        value: body.value,
        timeout_ms: body.timeout_ms,
    };
    match engine.execute(&owner, &request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

pub async fn goto(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/goto", ActionKind::Goto, body).await
}

pub async fn click(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/click", ActionKind::Click, body).await
}

pub async fn type_text(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/type", ActionKind::Type, body).await
}

pub async fn wait_for(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/waitFor", ActionKind::WaitFor, body).await
}

pub async fn select(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/select", ActionKind::Select, body).await
}

pub async fn evaluate(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/evaluate", ActionKind::Evaluate, body).await
}

pub async fn screenshot(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/screenshot", ActionKind::Screenshot, body).await
}

pub async fn pdf(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    execute(&state, &headers, "/v1/action/pdf", ActionKind::Pdf, body).await
}
