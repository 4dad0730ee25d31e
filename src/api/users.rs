// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! User management endpoints.
//!
//! All routes here sit behind the access-token middleware; authorization
//! has already happened by the time a handler runs.

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::Json;
use tracing::warn;

use crate::error::ApiError;
use crate::models::{Event, NewUser, User, UserUpdate};
use crate::state::AppState;

fn record_user_change(state: &AppState, method: &Method, username: &str) {
    if let Err(err) = state.events.record(Event::user_change(method, username)) {
        warn!(error = %err, "failed to store user event");
    }
}

#[utoipa::path(
    get,
    path = "/v1/user",
    tag = "Users",
    responses((status = 200, body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list()?))
}

#[utoipa::path(
    post,
    path = "/v1/user",
    request_body = NewUser,
    tag = "Users",
    responses(
        (status = 200, body = User),
        (status = 400, description = "Constraint violation")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.create(body)?;
    record_user_change(&state, &Method::POST, &user.username);
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/v1/user/{id}",
    params(("id" = String, Path, description = "Numeric id or username")),
    tag = "Users",
    responses(
        (status = 200, body = User),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .users
        .get(&id)
        .map_err(|_| ApiError::not_found(format!("user {id} is not found")))?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/v1/user/{id}",
    params(("id" = String, Path, description = "Numeric id or username")),
    request_body = UserUpdate,
    tag = "Users",
    responses(
        (status = 200, body = User),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.update(&id, body)?;
    record_user_change(&state, &Method::PATCH, &user.username);
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/v1/user/{id}",
    params(("id" = String, Path, description = "Numeric id or username")),
    tag = "Users",
    responses(
        (status = 204),
        (status = 400, description = "The default administrator is protected"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state.users.delete(&id)?;
    record_user_change(&state, &Method::DELETE, &removed.username);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::state::testing::test_state;

    fn new_user(username: &str) -> Json<NewUser> {
        Json(NewUser {
            username: username.into(),
            password: "Str0ng!pass".into(),
            roles: vec!["HELPDESK".into()],
        })
    }

    #[tokio::test]
    async fn create_then_get_and_list() {
        let state = test_state();
        let Json(created) = create_user(State(state.clone()), new_user("alice"))
            .await
            .unwrap();
        assert_eq!(created.username, "alice");

        let Json(fetched) = get_user(State(state.clone()), Path("alice".into()))
            .await
            .unwrap();
        assert_eq!(fetched.id, created.id);

        let Json(all) = list_users(State(state.clone())).await.unwrap();
        // Seeded admin plus the new account.
        assert_eq!(all.len(), 2);

        // Creation was recorded.
        assert_eq!(state.events.count_by_severity(Severity::Cleared), 1);
    }

    #[tokio::test]
    async fn get_unknown_user_is_404() {
        let state = test_state();
        let err = get_user(State(state), Path("ghost".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "user ghost is not found");
    }

    #[tokio::test]
    async fn create_duplicate_is_400() {
        let state = test_state();
        create_user(State(state.clone()), new_user("alice"))
            .await
            .unwrap();
        let err = create_user(State(state), new_user("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_updates_roles_and_bumps_version() {
        let state = test_state();
        create_user(State(state.clone()), new_user("alice"))
            .await
            .unwrap();

        let Json(updated) = update_user(
            State(state),
            Path("alice".into()),
            Json(UserUpdate {
                roles: Some(vec!["ADMIN".into()]),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.roles, vec![crate::auth::roles::Role::Admin]);
    }

    #[tokio::test]
    async fn delete_user_records_event() {
        let state = test_state();
        let Json(created) = create_user(State(state.clone()), new_user("alice"))
            .await
            .unwrap();

        let status = delete_user(State(state.clone()), Path(created.id.to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let descriptions: Vec<String> = state
            .events
            .list(1, 10)
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert!(descriptions.contains(&"Deleted user: alice".to_string()));
    }

    #[tokio::test]
    async fn deleting_default_admin_is_400() {
        let state = test_state();
        let err = delete_user(State(state), Path("1".into())).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
