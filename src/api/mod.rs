// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! HTTP surface: routing, OpenAPI documentation and shared request helpers.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::middleware::require_auth;
use crate::auth::roles::Role;
use crate::models::{Event, NewUser, Severity, User, UserUpdate};
use crate::state::AppState;

pub mod events;
pub mod health;
pub mod sessions;
pub mod system;
pub mod users;

/// Best client address for event records.
///
/// Prefers the last syntactically valid entry of `X-Forwarded-For`, falling
/// back to the peer socket address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let cleaned = forwarded.replace(' ', "");
        if let Some(last) = cleaned.split(',').next_back() {
            if last.parse::<IpAddr>().is_ok() {
                return Some(last.to_string());
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

/// Extractor form of [`client_ip`]; the peer address comes from the
/// connection info the server attaches to each request.
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/user", get(users::list_users).post(users::create_user))
        .route(
            "/user/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/event", get(events::list_events))
        .route("/system", get(system::system_info))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let v1 = Router::new()
        .route(
            "/session",
            post(sessions::create_session).delete(sessions::delete_session),
        )
        .route("/renew", post(sessions::renew_session))
        .merge(protected);

    Router::new()
        .route("/health", get(health::health))
        .route("/versions", get(system::list_versions))
        .nest("/v1", v1)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        sessions::create_session,
        sessions::delete_session,
        sessions::renew_session,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        events::list_events,
        system::list_versions,
        system::system_info,
        health::health
    ),
    components(
        schemas(
            User,
            NewUser,
            UserUpdate,
            Role,
            Event,
            Severity,
            sessions::CreateSessionRequest,
            sessions::SessionTokens,
            sessions::RenewRequest,
            events::EventsResponse,
            events::EventSummary,
            events::SeverityCounts,
            system::ApiVersionInfo,
            system::SystemInfo,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Sessions", description = "Login and token renewal"),
        (name = "Users", description = "User management"),
        (name = "Events", description = "Security event log"),
        (name = "System", description = "Service metadata")
    )
)]
struct ApiDoc;
