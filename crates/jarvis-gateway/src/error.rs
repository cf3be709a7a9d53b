//! The uniform HTTP error shape from spec.md §7: `{error, message, details?,
//! requestId, traceId, path, method, statusCode, timestamp}`. Grounded on
//! the teacher's `OpenResponsesApiError` (status + code + message,
//! `IntoResponse` builds the body), generalized to carry the request
//! metadata the taxonomy's "user-visible failure" section calls for.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jarvis_model::JarvisError;
use serde_json::{json, Value};
use uuid::Uuid;

/// One HTTP-shaped failure. Built from a [`JarvisError`] plus the request's
/// method/path so every error response is self-describing without the
/// caller needing to correlate against server logs by hand.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
    method: String,
    path: String,
    request_id: String,
    trace_id: String,
}

impl ApiError {
    pub fn from_jarvis(error: JarvisError, method: &str, path: &str) -> Self {
        Self {
            status: status_for(&error),
            code: error.code(),
            message: error.to_string(),
            details: None,
            method: method.to_string(),
            path: path.to_string(),
            request_id: Uuid::new_v4().to_string(),
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>, method: &str, path: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
            details: None,
            method: method.to_string(),
            path: path.to_string(),
            request_id: Uuid::new_v4().to_string(),
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn unauthorized(method: &str, path: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "authentication_required",
            message: "missing or invalid bearer token".to_string(),
            details: None,
            method: method.to_string(),
            path: path.to_string(),
            request_id: Uuid::new_v4().to_string(),
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Taxonomy → status code, per spec.md §7. `RateLimit`/`CapacityExceeded`
/// both surface as 429 (the table lists both session-create admission and
/// general rate-limit breaches under that status).
fn status_for(error: &JarvisError) -> StatusCode {
    match error {
        JarvisError::Validation(_) => StatusCode::BAD_REQUEST,
        JarvisError::Authentication => StatusCode::UNAUTHORIZED,
        JarvisError::AccessDenied(_) => StatusCode::FORBIDDEN,
        JarvisError::RunNotFound(_) | JarvisError::NodeNotFound(_) => StatusCode::NOT_FOUND,
        JarvisError::Conflict(_) => StatusCode::CONFLICT,
        JarvisError::RateLimit(_) | JarvisError::CapacityExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        JarvisError::PolicyViolation(_) | JarvisError::BudgetExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JarvisError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        JarvisError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        JarvisError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
        JarvisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code,
            "message": self.message,
            "details": self.details,
            "requestId": self.request_id,
            "traceId": self.trace_id,
            "path": self.path,
            "method": self.method,
            "statusCode": self.status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));
        let mut response = (self.status, body).into_response();
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            if let Ok(value) = "60".parse() {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Validates the `Idempotency-Key` header's charset (alphanumeric plus
/// `-`/`_`) per spec.md §6. Absent header is fine; an invalid one fails the
/// request before it ever reaches the orchestrator.
pub fn idempotency_key_from_headers(headers: &HeaderMap, method: &str, path: &str) -> Result<Option<String>, ApiError> {
    let Some(raw) = headers.get("idempotency-key") else {
        return Ok(None);
    };
    let key = raw
        .to_str()
        .map_err(|_| ApiError::bad_request("validation_error", "Idempotency-Key header is not valid UTF-8", method, path))?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::bad_request(
            "validation_error",
            "Idempotency-Key must be alphanumeric plus '-'/'_'",
            method,
            path,
        ));
    }
    Ok(Some(key.to_string()))
}
