use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{multipart_error, text_field};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::api::session::Session;
use crate::registry::parse_queries;
use crate::storage::models::{
    EvaluationParameters, EvaluationRecord, EvaluationSummary, MetricKind,
};
use crate::AppState;

const MAX_TOP_K: u32 = 20;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RunEvaluationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub queries: Vec<String>,
    #[serde(default)]
    pub relevance_threshold: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub metrics: Option<Vec<MetricKind>>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub id: String,
    #[serde(flatten)]
    pub record: EvaluationRecord,
}

#[derive(Debug, Serialize)]
pub struct EvaluationListItem {
    pub id: String,
    #[serde(flatten)]
    pub summary: EvaluationSummary,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn run_evaluation(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<RunEvaluationRequest>,
) -> Result<Json<JSend<EvaluationResponse>>, ApiError> {
    let queries: Vec<String> = req
        .queries
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();

    run(&state, &session, req, queries)
}

/// Same as `run_evaluation`, with the queries taken from an uploaded CSV or TXT file.
pub async fn upload_evaluation(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<JSend<EvaluationResponse>>, ApiError> {
    let mut req = RunEvaluationRequest::default();
    let mut queries: Option<Vec<String>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;

                queries = Some(parse_queries(
                    &data,
                    file_name.as_deref(),
                    content_type.as_deref(),
                )?);
            }
            "name" => req.name = Some(text_field(field, "name").await?),
            "description" => req.description = Some(text_field(field, "description").await?),
            "relevance_threshold" => {
                let value = text_field(field, "relevance_threshold").await?;
                req.relevance_threshold = Some(value.trim().parse().map_err(|_| {
                    ApiError::bad_request("relevance_threshold must be a number")
                })?);
            }
            "top_k" => {
                let value = text_field(field, "top_k").await?;
                req.top_k = Some(value.trim().parse().map_err(|_| {
                    ApiError::bad_request("top_k must be a non-negative integer")
                })?);
            }
            "metrics" => {
                let value = text_field(field, "metrics").await?;
                let metrics = value
                    .split(',')
                    .filter(|m| !m.trim().is_empty())
                    .map(|m| m.parse::<MetricKind>().map_err(ApiError::bad_request))
                    .collect::<Result<Vec<_>, _>>()?;
                req.metrics = Some(metrics);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let queries = queries.ok_or_else(|| ApiError::bad_request("Please upload a query file"))?;
    run(&state, &session, req, queries)
}

/// All evaluations, newest first.
pub async fn list_evaluations(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<JSend<Vec<EvaluationListItem>>>, ApiError> {
    let mut items: Vec<EvaluationListItem> = state
        .evaluations
        .list()?
        .into_iter()
        .map(|(id, summary)| EvaluationListItem { id, summary })
        .collect();

    items.sort_by(|a, b| {
        b.summary
            .timestamp
            .cmp(&a.summary.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });

    Ok(JSend::success(items))
}

pub async fn get_evaluation(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<String>,
) -> Result<Json<JSend<EvaluationResponse>>, ApiError> {
    let record = state.evaluations.get(&id)?;
    Ok(JSend::success(EvaluationResponse { id, record }))
}

pub async fn delete_evaluation(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.evaluations.delete(&id)?;
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

fn run(
    state: &AppState,
    session: &Session,
    req: RunEvaluationRequest,
    queries: Vec<String>,
) -> Result<Json<JSend<EvaluationResponse>>, ApiError> {
    if queries.is_empty() {
        return Err(ApiError::bad_request("at least one query is required"));
    }

    let parameters = build_parameters(req.relevance_threshold, req.top_k, req.metrics)?;
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Evaluation_{}", Utc::now().format("%Y%m%d_%H%M")));
    let description = req
        .description
        .unwrap_or_else(|| "RAG system evaluation".to_string());

    let (id, record) = state
        .evaluations
        .run(&name, &description, &queries, parameters)?;

    tracing::info!(eval_id = %id, started_by = %session.username, "Evaluation completed");
    Ok(JSend::success(EvaluationResponse { id, record }))
}

fn build_parameters(
    relevance_threshold: Option<f64>,
    top_k: Option<u32>,
    metrics: Option<Vec<MetricKind>>,
) -> Result<EvaluationParameters, ApiError> {
    let defaults = EvaluationParameters::default();

    let relevance_threshold = relevance_threshold.unwrap_or(defaults.relevance_threshold);
    if !(0.0..=1.0).contains(&relevance_threshold) {
        return Err(ApiError::bad_request(
            "relevance_threshold must be between 0 and 1",
        ));
    }

    let top_k = top_k.unwrap_or(defaults.top_k);
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(ApiError::bad_request(format!(
            "top_k must be between 1 and {MAX_TOP_K}"
        )));
    }

    let mut metrics = metrics.unwrap_or(defaults.metrics);
    if metrics.is_empty() {
        return Err(ApiError::bad_request("at least one metric is required"));
    }
    let mut seen = Vec::with_capacity(metrics.len());
    metrics.retain(|m| {
        let first = !seen.contains(m);
        seen.push(*m);
        first
    });

    Ok(EvaluationParameters {
        relevance_threshold,
        top_k,
        metrics,
    })
}
