use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::api::session::Session;
use crate::storage::models::UserSummary;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<JSend<Vec<UserSummary>>>, ApiError> {
    let users = state.backend.list_users().await?;
    Ok(JSend::success(users))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<Json<JSend<UserSummary>>, ApiError> {
    let username = req.username.as_str();
    if username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    if req.password != req.confirm_password {
        return Err(ApiError::bad_request("Passwords do not match"));
    }

    let user = state
        .backend
        .create_user(username, &req.password, &session.username)
        .await?;

    Ok(JSend::success(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if username == session.username {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    state.backend.delete_user(&username).await?;
    let revoked = state.sessions.revoke_user(&username, None).await;

    tracing::info!(username = %username, deleted_by = %session.username, revoked, "Deleted user");
    Ok(JSend::success(()))
}

/// Change the caller's own password. Their other sessions are ended.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<JSend<()>>, ApiError> {
    if req.new_password.is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }
    if req.new_password != req.confirm_password {
        return Err(ApiError::bad_request(
            "New password and confirmation do not match",
        ));
    }

    state
        .backend
        .change_password(&session.username, &req.old_password, &req.new_password)
        .await?;
    state
        .sessions
        .revoke_user(&session.username, Some(session.token.as_str()))
        .await;

    Ok(JSend::success(()))
}
