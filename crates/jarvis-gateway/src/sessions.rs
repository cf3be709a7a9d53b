//! `/v1/session/{create,close,list}`. These bypass the orchestrator
//! entirely — they operate on the Session Manager directly, matching
//! spec.md §4.1's contract one-for-one.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jarvis_model::SessionId;
use serde::Deserialize;
use std::str::FromStr;

use crate::auth::owner_from_bearer;
use crate::error::ApiError;
use crate::state::GatewayState;

fn session_manager_or_error<'a>(state: &'a GatewayState, method: &str, path: &str) -> Result<&'a jarvis_browser::SessionManager, ApiError> {
    state
        .session_manager
        .as_deref()
        .ok_or_else(|| ApiError::from_jarvis(jarvis_model::JarvisError::ExternalService("no browser backend configured".to_string()), method, path))
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn create_session(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(_request): Json<CreateSessionRequest>) -> Response {
    let method = "POST";
    let path = "/v1/session/create";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let manager = match session_manager_or_error(&state, method, path) {
        Ok(manager) => manager,
        Err(error) => return error.into_response(),
    };

    match manager.create(owner).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    pub session_id: String,
}

pub async fn close_session(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(request): Json<CloseSessionRequest>) -> Response {
    let method = "POST";
    let path = "/v1/session/close";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let manager = match session_manager_or_error(&state, method, path) {
        Ok(manager) => manager,
        Err(error) => return error.into_response(),
    };
    let session_id = match SessionId::from_str(&request.session_id) {
        Ok(id) => id,
        Err(_) => return ApiError::bad_request("validation_error", "invalid session id", method, path).into_response(),
    };

    match manager.close(session_id, &owner).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => ApiError::from_jarvis(error, method, path).into_response(),
    }
}

pub async fn list_sessions(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    let method = "GET";
    let path = "/v1/session/list";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let manager = match session_manager_or_error(&state, method, path) {
        Ok(manager) => manager,
        Err(error) => return error.into_response(),
    };

    (StatusCode::OK, Json(manager.list(&owner).await)).into_response()
}
