// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User and session endpoints.
//!
//! Every authenticated call carries the session token in the JSON body as
//! `auth_code`. Login is idempotent per username: while a session is live,
//! repeat logins return the same token.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::UserRecord;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque session token for subsequent calls.
    pub auth_code: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthedRequest {
    pub auth_code: Uuid,
}

/// A user as exposed over the wire. Passwords never leave the store.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    pub username: String,
    pub role: Role,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddUserRequest {
    pub auth_code: Uuid,
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteUserRequest {
    pub auth_code: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewerListResponse {
    pub reviewers: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleListResponse {
    pub roles: Vec<Role>,
}

/// Authenticate and obtain a session token.
#[utoipa::path(
    post,
    path = "/api/v0/user/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = LoginResponse),
        (status = 400, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.auth.login(&input.username, &input.password).await?;
    Ok(Json(LoginResponse {
        auth_code: session.token,
        username: session.username,
        role: session.role,
    }))
}

/// Revoke the calling session.
#[utoipa::path(
    post,
    path = "/api/v0/user/logout",
    tag = "Users",
    request_body = AuthedRequest,
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Unknown or expired token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<()>, ApiError> {
    state.auth.logout(input.auth_code).await?;
    Ok(Json(()))
}

/// Identity behind the calling token.
#[utoipa::path(
    post,
    path = "/api/v0/user/info",
    tag = "Users",
    request_body = AuthedRequest,
    responses(
        (status = 200, description = "Caller identity", body = UserView),
        (status = 401, description = "Unknown or expired token"),
    )
)]
pub async fn user_info(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<UserView>, ApiError> {
    let user = state.auth.user_by_token(input.auth_code).await?;
    Ok(Json(UserView {
        username: user.username,
        role: user.role,
    }))
}

/// Create a user (admin only).
#[utoipa::path(
    post,
    path = "/api/v0/add/user",
    tag = "Users",
    request_body = AddUserRequest,
    responses(
        (status = 200, description = "User created"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Username already exists"),
    )
)]
pub async fn add_user(
    State(state): State<AppState>,
    Json(input): Json<AddUserRequest>,
) -> Result<Json<()>, ApiError> {
    state
        .auth
        .add_user(input.auth_code, &input.username, &input.password, input.role)
        .await?;
    Ok(Json(()))
}

/// Replace a user's password and role (admin only). Revokes the user's
/// live session.
#[utoipa::path(
    post,
    path = "/api/v0/change/user",
    tag = "Users",
    request_body = AddUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown username"),
    )
)]
pub async fn change_user(
    State(state): State<AppState>,
    Json(input): Json<AddUserRequest>,
) -> Result<Json<()>, ApiError> {
    state
        .auth
        .change_user(input.auth_code, &input.username, &input.password, input.role)
        .await?;
    Ok(Json(()))
}

/// Delete a user (admin only).
#[utoipa::path(
    post,
    path = "/api/v0/delete/user",
    tag = "Users",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown username"),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Json(input): Json<DeleteUserRequest>,
) -> Result<Json<()>, ApiError> {
    state.auth.delete_user(input.auth_code, &input.username).await?;
    Ok(Json(()))
}

/// All users (admin only).
#[utoipa::path(
    post,
    path = "/api/v0/list/users",
    tag = "Users",
    request_body = AuthedRequest,
    responses(
        (status = 200, description = "All users", body = [UserView]),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.auth.list_users(input.auth_code).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// Usernames holding the reviewer role.
#[utoipa::path(
    post,
    path = "/api/v0/list/reviewers",
    tag = "Users",
    request_body = AuthedRequest,
    responses(
        (status = 200, description = "Available reviewers", body = ReviewerListResponse),
        (status = 404, description = "No reviewers configured"),
    )
)]
pub async fn list_reviewers(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<ReviewerListResponse>, ApiError> {
    let reviewers = state.auth.list_reviewers(input.auth_code).await?;
    Ok(Json(ReviewerListResponse { reviewers }))
}

/// The configured role catalog.
#[utoipa::path(
    post,
    path = "/api/v0/list/roles",
    tag = "Users",
    request_body = AuthedRequest,
    responses((status = 200, description = "Role catalog", body = RoleListResponse))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<RoleListResponse>, ApiError> {
    let roles = state.auth.list_roles(input.auth_code).await?;
    Ok(Json(RoleListResponse { roles }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_view_drops_the_password() {
        let view: UserView = UserRecord {
            username: "alice".into(),
            password: "secret".into(),
            role: Role::from(Role::ACCOUNTER),
        }
        .into();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "accounter");
        assert!(json.get("password").is_none());
    }
}
