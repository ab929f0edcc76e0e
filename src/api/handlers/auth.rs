use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::api::session::Session;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<LoginResponse>>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    if !state
        .backend
        .verify_credentials(&req.username, &req.password)
        .await?
    {
        tracing::info!(username = %req.username, "Rejected login");
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let session = state.sessions.create(&req.username).await;
    tracing::info!(username = %session.username, "Logged in");

    Ok(JSend::success(LoginResponse {
        token: session.token,
        username: session.username,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Json<JSend<()>> {
    state.sessions.revoke(&session.token).await;
    tracing::info!(username = %session.username, "Logged out");
    JSend::success(())
}

pub async fn me(session: Session) -> Json<JSend<Session>> {
    JSend::success(session)
}
