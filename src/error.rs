// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! API error type.
//!
//! Handlers return `Result<impl IntoResponse, ApiError>`; the error
//! renders as `{"error": "..."}` with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::token::TokenError;
use crate::store::StoreError;

/// An error response: HTTP status plus a caller-facing message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::not_found(msg),
            StoreError::Invalid(msg) => Self::bad_request(msg),
            StoreError::Internal(msg) => Self::internal(msg),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => Self::internal(e.to_string()),
            _ => Self::unauthorized("supplied token is not valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let not_found: ApiError = StoreError::NotFound("user 9 not present in database".into()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let invalid: ApiError = StoreError::Invalid("username cannot be empty".into()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let internal: ApiError = StoreError::Internal("backend down".into()).into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_errors_map_to_unauthorized() {
        let err: ApiError = TokenError::Expired.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "supplied token is not valid");
    }

    #[test]
    fn display_includes_status_and_message() {
        let err = ApiError::forbidden("forbidden request");
        assert_eq!(err.to_string(), "403 Forbidden: forbidden request");
    }
}
