// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Session endpoints: login, logout and access-token renewal.

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::AppendHeaders;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::claims::{AccessClaims, StandardClaims};
use crate::auth::middleware::bearer_token;
use crate::auth::roles::{self, Role};
use crate::error::ApiError;
use crate::models::{Event, User, EXTERNAL_DOMAIN, INTERNAL_DOMAIN};
use crate::state::AppState;

use super::ClientIp;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Token minted by a trusted external issuer, for machine callers.
    /// May also be supplied in the `Authorization` header.
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renew_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CreateSessionQuery {
    /// When true, the returned access token expires immediately. Proves
    /// the credentials without granting a usable session.
    #[serde(default)]
    pub validate: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    pub user_id: String,
    pub renew_token: String,
}

type TokenHeaders = AppendHeaders<[(HeaderName, String); 1]>;

fn record(state: &AppState, event: Event) {
    if let Err(err) = state.events.record(event) {
        warn!(error = %err, "failed to store event");
    }
}

/// Authenticated principal plus the domain that vouched for it.
struct Authenticated {
    user: User,
    domain: &'static str,
}

fn authenticate_m2m(
    state: &AppState,
    token: &str,
    ip: &str,
) -> Result<Authenticated, ApiError> {
    let claims = state.trusted.verify(token).map_err(|err| {
        warn!(error = %err, "authorization failure");
        record(
            state,
            Event::unsuccessful_login("unknown", EXTERNAL_DOMAIN, ip),
        );
        ApiError::unauthorized("supplied token is not valid")
    })?;

    // Unknown role names in a trusted token downgrade to no grants rather
    // than failing the login.
    let granted = match roles::parse_roles(&claims.roles) {
        Ok(granted) => granted,
        Err(err) => {
            warn!(error = %err, "unable to convert roles");
            Vec::new()
        }
    };
    state
        .ext_users
        .insert(claims.standard.sub.clone(), granted.clone());

    Ok(Authenticated {
        user: User {
            id: 0,
            username: claims.standard.sub,
            password_hash: String::new(),
            version: 0,
            roles: granted,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        },
        domain: EXTERNAL_DOMAIN,
    })
}

fn authenticate_password(
    state: &AppState,
    username: &str,
    password: &str,
    ip: &str,
) -> Result<Authenticated, ApiError> {
    match state.users.validate_credentials(username, password) {
        Some(user) => Ok(Authenticated {
            user,
            domain: INTERNAL_DOMAIN,
        }),
        None => {
            record(state, Event::unsuccessful_login(username, INTERNAL_DOMAIN, ip));
            Err(ApiError::unauthorized("user not allowed"))
        }
    }
}

fn issue_tokens(
    state: &AppState,
    user: &User,
    domain: &str,
    access_ttl: i64,
) -> Result<SessionTokens, ApiError> {
    let claims = AccessClaims::new(
        user.username.clone(),
        roles::role_names(&user.roles),
        domain,
        access_ttl,
    );
    let access_token = state.signer.sign_access(&claims).map_err(|err| {
        record(state, Event::signing_failure(&user.username, domain));
        ApiError::internal(err.to_string())
    })?;

    let renew_token = match state.renew_ttl_secs {
        Some(ttl) => {
            let renew_claims = StandardClaims::new(user.username.clone(), domain, ttl);
            Some(
                state
                    .signer
                    .sign_renew(&renew_claims)
                    .map_err(|err| ApiError::internal(err.to_string()))?,
            )
        }
        None => None,
    };

    Ok(SessionTokens {
        access_token,
        renew_token,
    })
}

#[utoipa::path(
    post,
    path = "/v1/session",
    params(CreateSessionQuery),
    request_body = CreateSessionRequest,
    tag = "Sessions",
    responses(
        (status = 200, body = SessionTokens),
        (status = 401, description = "Bad credentials or untrusted token")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<CreateSessionQuery>,
    headers: HeaderMap,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(TokenHeaders, Json<SessionTokens>), ApiError> {
    let ip = ip.unwrap_or_default();

    // A token may arrive in the body or the Authorization header; its
    // presence selects machine-to-machine authentication.
    let token = if body.access_token.is_empty() {
        bearer_token(&headers)
    } else {
        body.access_token.clone()
    };

    let authenticated = if token.is_empty() {
        authenticate_password(&state, &body.username, &body.password, &ip)?
    } else {
        authenticate_m2m(&state, &token, &ip)?
    };

    record(
        &state,
        Event::successful_login(&authenticated.user.username, authenticated.domain, &ip),
    );
    info!(
        username = %authenticated.user.username,
        domain = authenticated.domain,
        validate = query.validate,
        "session created"
    );

    let access_ttl = if query.validate { 0 } else { state.access_ttl_secs };
    let tokens = issue_tokens(&state, &authenticated.user, authenticated.domain, access_ttl)?;

    let header = (
        AUTHORIZATION,
        format!("Bearer {}", tokens.access_token),
    );
    Ok((AppendHeaders([header]), Json(tokens)))
}

#[utoipa::path(
    delete,
    path = "/v1/session",
    tag = "Sessions",
    responses((status = 204))
)]
pub async fn delete_session() -> StatusCode {
    // Tokens are stateless; nothing is stored per session to invalidate.
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    post,
    path = "/v1/renew",
    request_body = RenewRequest,
    tag = "Sessions",
    responses(
        (status = 200, body = SessionTokens),
        (status = 401, description = "Invalid renew token or revoked user")
    )
)]
pub async fn renew_session(
    State(state): State<AppState>,
    Json(body): Json<RenewRequest>,
) -> Result<(TokenHeaders, Json<SessionTokens>), ApiError> {
    // The subject must still be known: either an external grant from a
    // live M2M session or a local account that has not been deleted.
    let (username, granted): (String, Vec<Role>) =
        match state.ext_users.roles_of(&body.user_id) {
            Some(granted) => (body.user_id.clone(), granted),
            None => {
                let user = state.users.get(&body.user_id).map_err(|err| match err {
                    crate::store::StoreError::NotFound(_) => {
                        ApiError::unauthorized("user revoked")
                    }
                    _ => ApiError::internal("internal error, retry later"),
                })?;
                (user.username, user.roles)
            }
        };

    let claims = state.signer.verify_renew(&body.renew_token).map_err(|err| {
        info!(error = %err, "invalid renew token");
        ApiError::unauthorized("invalid renew token")
    })?;

    // The renewed access token keeps the original authenticating domain
    // and lives as long as a renew token would.
    let ttl = state.renew_ttl_secs.unwrap_or(0);
    let access_claims = AccessClaims::new(username, roles::role_names(&granted), claims.iss, ttl);
    let access_token = state
        .signer
        .sign_access(&access_claims)
        .map_err(|err| ApiError::internal(err.to_string()))?;

    let header = (AUTHORIZATION, format!("Bearer {access_token}"));
    Ok((
        AppendHeaders([header]),
        // The renew token is reused, not rotated.
        Json(SessionTokens {
            access_token,
            renew_token: Some(body.renew_token),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::{parse_private_key, read_key_material};
    use crate::auth::token::{TokenSigner, TrustedKeys};
    use crate::models::Severity;
    use crate::state::testing::{test_state, test_state_with_trusted};
    use rsa::RsaPublicKey;

    const PKCS8_KEY_PEM: &str = include_str!("../../testdata/test_key_pkcs8.pem");

    fn login_body(username: &str, password: &str) -> Json<CreateSessionRequest> {
        Json(CreateSessionRequest {
            username: username.into(),
            password: password.into(),
            access_token: String::new(),
        })
    }

    async fn login(
        state: &AppState,
        body: Json<CreateSessionRequest>,
        validate: bool,
    ) -> Result<SessionTokens, ApiError> {
        let (_, Json(tokens)) = create_session(
            State(state.clone()),
            ClientIp(None),
            Query(CreateSessionQuery { validate }),
            HeaderMap::new(),
            body,
        )
        .await?;
        Ok(tokens)
    }

    #[tokio::test]
    async fn password_login_returns_both_tokens() {
        let state = test_state();
        let tokens = login(&state, login_body("admin", "admin"), false)
            .await
            .unwrap();

        let claims = state.signer.verify_access(&tokens.access_token).unwrap();
        assert_eq!(claims.standard.sub, "admin");
        assert_eq!(claims.azt, INTERNAL_DOMAIN);
        assert_eq!(claims.roles, vec!["ADMIN"]);

        let renew = tokens.renew_token.expect("renew token");
        let renew_claims = state.signer.verify_renew(&renew).unwrap();
        assert_eq!(renew_claims.iss, INTERNAL_DOMAIN);

        assert_eq!(state.events.count_by_severity(Severity::Cleared), 1);
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected_and_recorded() {
        let state = test_state();
        let err = login(&state, login_body("admin", "wrong"), false)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "user not allowed");
        assert_eq!(state.events.count_by_severity(Severity::Warning), 1);
    }

    #[tokio::test]
    async fn validate_mode_returns_expired_token() {
        let state = test_state();
        let tokens = login(&state, login_body("admin", "admin"), true)
            .await
            .unwrap();

        assert!(state.signer.verify_access(&tokens.access_token).is_err());
    }

    #[tokio::test]
    async fn renew_disabled_omits_renew_token() {
        let mut state = test_state();
        state.renew_ttl_secs = None;
        let tokens = login(&state, login_body("admin", "admin"), false)
            .await
            .unwrap();

        assert!(tokens.renew_token.is_none());
    }

    #[tokio::test]
    async fn m2m_login_grants_cached_roles() {
        let der = read_key_material(PKCS8_KEY_PEM).unwrap();
        let private = parse_private_key(&der).unwrap();
        let public = RsaPublicKey::from(&private);
        let issuer = TokenSigner::rsa(&public, &private).unwrap();
        let trusted = TrustedKeys::from_public_keys(&[public]).unwrap();
        let state = test_state_with_trusted(trusted);

        let external = AccessClaims::new("svc-a", vec!["MONITOR".into()], "", 300);
        let token = issuer.sign_access(&external).unwrap();

        let tokens = login(
            &state,
            Json(CreateSessionRequest {
                access_token: token,
                ..Default::default()
            }),
            false,
        )
        .await
        .unwrap();

        let claims = state.signer.verify_access(&tokens.access_token).unwrap();
        assert_eq!(claims.standard.sub, "svc-a");
        assert_eq!(claims.azt, EXTERNAL_DOMAIN);
        assert_eq!(claims.roles, vec!["MONITOR"]);
        assert_eq!(state.ext_users.roles_of("svc-a"), Some(vec![Role::Monitor]));
    }

    #[tokio::test]
    async fn m2m_login_fails_closed_without_trusted_keys() {
        let state = test_state();
        let err = login(
            &state,
            Json(CreateSessionRequest {
                access_token: "some.jwt.token".into(),
                ..Default::default()
            }),
            false,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "supplied token is not valid");
        assert_eq!(state.events.count_by_severity(Severity::Warning), 1);
    }

    #[tokio::test]
    async fn renew_mints_fresh_access_token() {
        let state = test_state();
        let tokens = login(&state, login_body("admin", "admin"), false)
            .await
            .unwrap();
        let renew_token = tokens.renew_token.unwrap();

        let (_, Json(renewed)) = renew_session(
            State(state.clone()),
            Json(RenewRequest {
                user_id: "admin".into(),
                renew_token: renew_token.clone(),
            }),
        )
        .await
        .unwrap();

        let claims = state.signer.verify_access(&renewed.access_token).unwrap();
        assert_eq!(claims.standard.sub, "admin");
        assert_eq!(claims.azt, INTERNAL_DOMAIN);
        // The renew token itself is returned unchanged.
        assert_eq!(renewed.renew_token, Some(renew_token));
    }

    #[tokio::test]
    async fn renew_rejects_deleted_user() {
        let state = test_state();
        let err = renew_session(
            State(state),
            Json(RenewRequest {
                user_id: "ghost".into(),
                renew_token: "irrelevant".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "user revoked");
    }

    #[tokio::test]
    async fn renew_rejects_bad_token() {
        let state = test_state();
        let err = renew_session(
            State(state),
            Json(RenewRequest {
                user_id: "admin".into(),
                renew_token: "not.a.token".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "invalid renew token");
    }

    #[tokio::test]
    async fn renew_uses_external_grant_when_cached() {
        let state = test_state();
        state.ext_users.insert("svc-a", vec![Role::Monitor]);
        // External sessions renew against the deployment's own renew token.
        let renew_claims = StandardClaims::new("svc-a", EXTERNAL_DOMAIN, 600);
        let renew_token = state.signer.sign_renew(&renew_claims).unwrap();

        let (_, Json(renewed)) = renew_session(
            State(state.clone()),
            Json(RenewRequest {
                user_id: "svc-a".into(),
                renew_token,
            }),
        )
        .await
        .unwrap();

        let claims = state.signer.verify_access(&renewed.access_token).unwrap();
        assert_eq!(claims.roles, vec!["MONITOR"]);
        assert_eq!(claims.azt, EXTERNAL_DOMAIN);
    }
}
