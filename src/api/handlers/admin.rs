use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::api::session::Session;
use crate::vector_db::CollectionInfo;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub backend: String,
    pub status: String,
    pub version: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        backend: state.backend.name().to_string(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn vector_db_info(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<JSend<CollectionInfo>>, ApiError> {
    let info = state.vector_index.collection_info().await?;
    Ok(JSend::success(info))
}
