// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Access-token middleware for the protected route subtree.
//!
//! Verifies the bearer token, applies the role-based authorization rules
//! and stores the decoded claims in request extensions for handlers that
//! need the caller identity.

use axum::extract::{RawPathParams, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use crate::auth::authz::authorize;
use crate::error::ApiError;
use crate::state::AppState;

/// Extract the token from the `Authorization` header.
///
/// The `Bearer` keyword is optional; a bare token is accepted too.
pub fn bearer_token(headers: &HeaderMap) -> String {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    raw.strip_prefix("Bearer").unwrap_or(raw).trim().to_string()
}

/// Require a valid access token and authorize the request.
pub async fn require_auth(
    State(state): State<AppState>,
    params: RawPathParams,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers());
    let claims = state.signer.verify_access(&token).map_err(|err| {
        info!(error = %err, "unauthorized request");
        ApiError::unauthorized("unauthorized request")
    })?;

    let target = params
        .iter()
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value);
    if !authorize(&claims.roles, request.method(), &claims.standard.sub, target) {
        return Err(ApiError::forbidden("forbidden request"));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
