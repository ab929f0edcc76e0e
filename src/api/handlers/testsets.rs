use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::api::session::Session;
use crate::registry::TestsetFile;
use crate::AppState;

const MAX_TESTSET_ROWS: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateTestsetRequest {
    pub count: u32,
}

pub async fn create_testset(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<CreateTestsetRequest>,
) -> Result<Json<JSend<TestsetFile>>, ApiError> {
    if req.count == 0 || req.count > MAX_TESTSET_ROWS {
        return Err(ApiError::bad_request(format!(
            "count must be between 1 and {MAX_TESTSET_ROWS}"
        )));
    }

    let file = state.testsets.generate(req.count as usize)?;
    tracing::debug!(testset = %file.name, created_by = %session.username, "Created testset");
    Ok(JSend::success(file))
}

/// Testset history, newest first.
pub async fn list_testsets(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<JSend<Vec<TestsetFile>>>, ApiError> {
    Ok(JSend::success(state.testsets.list()?))
}

pub async fn download_testset(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.testsets.read(&name)?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));

    // Only validated testset names reach this point, so the name is header-safe.
    if let Ok(value) = format!("attachment; filename=\"{name}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}
