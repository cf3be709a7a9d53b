//! Bearer-token authentication. spec.md §6: "authentication via bearer
//! token"; token parsing itself is named a thin-adapter concern the core
//! doesn't own, so this crate only needs to turn a valid header into the
//! `ownerUserId` the orchestrator authorizes against. Grounded on the
//! teacher's `bearer_token_from_headers` helper.

use axum::http::HeaderMap;

use crate::error::ApiError;

pub fn owner_from_bearer(headers: &HeaderMap, method: &str, path: &str) -> Result<String, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized(method, path))?;
    let raw = header.to_str().map_err(|_| ApiError::unauthorized(method, path))?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized(method, path));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::owner_from_bearer;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn unit_valid_bearer_header_yields_token_as_owner() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer user-42"));
        assert_eq!(owner_from_bearer(&headers, "GET", "/v1/runs").unwrap(), "user-42");
    }

    #[test]
    fn regression_missing_header_is_rejected() {
        let headers = HeaderMap::new();
        assert!(owner_from_bearer(&headers, "GET", "/v1/runs").is_err());
    }

    #[test]
    fn regression_empty_token_after_prefix_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(owner_from_bearer(&headers, "GET", "/v1/runs").is_err());
    }
}
