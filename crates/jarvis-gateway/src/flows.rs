//! Prebuilt browser flow templates (`/v1/flows/price-monitor`,
//! `/v1/flows/form-autofill`). spec.md §1 lists "flow templates" among the
//! external collaborators the core doesn't own; here they are exactly what
//! that implies — a thin translation from a flow-specific body into a
//! `Browser`-agent `RunInput` with a deterministic step list, handed
//! straight to the orchestrator.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jarvis_model::{ActionKind, AgentKind};
use jarvis_orchestrator::{BrowserStepSpec, RunInput, RunOptions};
use serde::Deserialize;

use crate::auth::owner_from_bearer;
use crate::error::{idempotency_key_from_headers, ApiError};
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct PriceMonitorRequest {
    url: String,
    #[serde(default)]
    price_selector: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormAutofillRequest {
    url: String,
    fields: Vec<FormField>,
}

#[derive(Debug, Deserialize)]
pub struct FormField {
    selector: String,
    value: String,
}

async fn run_flow(state: &GatewayState, owner: &str, idempotency_key: Option<&str>, steps: Vec<BrowserStepSpec>) -> Result<(StatusCode, jarvis_model::Run), ApiError> {
    let input = RunInput {
        prompt: None,
        data: serde_json::Value::Null,
        context: serde_json::Value::Null,
        options: RunOptions {
            agent_kind: Some(AgentKind::Browser),
            steps: Some(steps),
            ..RunOptions::default()
        },
    };
    let admission = state
        .orchestrator
        .create_run(owner, input, idempotency_key)
        .await
        .map_err(|error| ApiError::from_jarvis(error, "POST", "/v1/flows"))?;
    let status = if admission.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, admission.run))
}

pub async fn price_monitor(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(request): Json<PriceMonitorRequest>) -> Response {
    let method = "POST";
    let path = "/v1/flows/price-monitor";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let idempotency_key = match idempotency_key_from_headers(&headers, method, path) {
        Ok(key) => key,
        Err(error) => return error.into_response(),
    };

    let mut steps = vec![BrowserStepSpec {
        kind: ActionKind::Goto,
        target: Some(request.url),
        value: None,
    }];
    if let Some(selector) = request.price_selector {
        steps.push(BrowserStepSpec {
            kind: ActionKind::WaitFor,
            target: Some(selector.clone()),
            value: None,
        });
        steps.push(BrowserStepSpec {
            kind: ActionKind::Evaluate,
            target: Some(format!("document.querySelector({selector:?}).textContent")),
            value: None,
        });
    }

    match run_flow(&state, &owner, idempotency_key.as_deref(), steps).await {
        Ok((status, run)) => (status, Json(run)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub async fn form_autofill(State(state): State<Arc<GatewayState>>, headers: HeaderMap, Json(request): Json<FormAutofillRequest>) -> Response {
    let method = "POST";
    let path = "/v1/flows/form-autofill";
    let owner = match owner_from_bearer(&headers, method, path) {
        Ok(owner) => owner,
        Err(error) => return error.into_response(),
    };
    let idempotency_key = match idempotency_key_from_headers(&headers, method, path) {
        Ok(key) => key,
        Err(error) => return error.into_response(),
    };

    let mut steps = vec![BrowserStepSpec {
        kind: ActionKind::Goto,
        target: Some(request.url),
        value: None,
    }];
    for field in request.fields {
        steps.push(BrowserStepSpec {
            kind: ActionKind::Type,
            target: Some(field.selector),
            value: Some(field.value),
        });
    }

    match run_flow(&state, &owner, idempotency_key.as_deref(), steps).await {
        Ok((status, run)) => (status, Json(run)).into_response(),
        Err(error) => error.into_response(),
    }
}
