use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{multipart_error, parse_form_bool, text_field};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated, Pagination};
use crate::api::session::Session;
use crate::registry::NewFile;
use crate::storage::models::FileRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub file_size_bytes: u64,
    pub file_type: String,
    pub id: String,
    pub in_vector_db: bool,
    pub original_filename: String,
    pub path: String,
    pub stored_filename: String,
    pub upload_time: String,
    pub uploader: String,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    /// Case-insensitive substring of the original filename
    #[serde(default)]
    pub search: Option<String>,
    /// Exact MIME type
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub in_vector_db: Option<bool>,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct VectorMembershipRequest {
    pub in_vector_db: bool,
}

struct PendingUpload {
    data: Bytes,
    file_name: String,
    content_type: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Accepts one or more `file` parts and an optional `in_vector_db` flag.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<JSend<Vec<FileResponse>>>, ApiError> {
    let mut uploads: Vec<PendingUpload> = Vec::new();
    let mut in_vector_db = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ApiError::bad_request("file parts must carry a filename"))?;
                let content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File '{file_name}' exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                uploads.push(PendingUpload {
                    data,
                    file_name,
                    content_type,
                });
            }
            "in_vector_db" => {
                let value = text_field(field, "in_vector_db").await?;
                in_vector_db = parse_form_bool(&value, "in_vector_db")?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    if uploads.is_empty() {
        return Err(ApiError::bad_request("file field is required"));
    }

    let mut registered = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let (id, record) = state
            .backend
            .register_file(NewFile {
                data: upload.data,
                original_filename: upload.file_name,
                mime_type: upload.content_type,
                uploader: session.username.clone(),
                in_vector_db,
            })
            .await?;

        if record.in_vector_db {
            if let Err(e) = state.vector_index.add_file(&id, &record).await {
                tracing::warn!(file_id = %id, error = %e, "File uploaded but not added to vector DB");
            }
        }

        registered.push(file_to_response(&id, &record));
    }

    Ok(JSend::success(registered))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    _session: Session,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut files: Vec<(String, FileRecord)> = state
        .backend
        .list_files()
        .await?
        .into_iter()
        .filter(|(_, f)| {
            search
                .as_deref()
                .map_or(true, |s| f.original_filename.to_lowercase().contains(s))
        })
        .filter(|(_, f)| params.file_type.as_deref().map_or(true, |t| f.file_type == t))
        .filter(|(_, f)| params.in_vector_db.map_or(true, |v| f.in_vector_db == v))
        .collect();

    // Newest first
    files.sort_by(|(a_id, a), (b_id, b)| {
        b.upload_time
            .cmp(&a.upload_time)
            .then_with(|| a_id.cmp(b_id))
    });

    let total = files.len() as u64;
    let items: Vec<FileResponse> = files
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(|(id, record)| file_to_response(id, record))
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let record = state.backend.get_file(&id).await?;
    Ok(JSend::success(file_to_response(&id, &record)))
}

/// Delete a file and drop it from the vector collection.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let record = state.backend.delete_file(&id).await?;

    if record.in_vector_db {
        if let Err(e) = state.vector_index.remove_file(&id).await {
            tracing::warn!(file_id = %id, error = %e, "Deleted file but failed to remove it from vector DB");
        }
    }

    tracing::debug!(file_id = %id, deleted_by = %session.username, "Deleted file");
    Ok(JSend::success(()))
}

/// Add a file to, or remove it from, the vector collection and record the new flag.
pub async fn set_vector_membership(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<String>,
    AppJson(req): AppJson<VectorMembershipRequest>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let record = state.backend.get_file(&id).await?;

    if req.in_vector_db {
        state.vector_index.add_file(&id, &record).await?;
    } else {
        state.vector_index.remove_file(&id).await?;
    }

    let record = state.backend.set_vector_flag(&id, req.in_vector_db).await?;
    Ok(JSend::success(file_to_response(&id, &record)))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state.backend.get_file(&id).await?;
    let (data, filename) = state.backend.fetch_file(&id).await?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        record
            .file_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    if let Ok(value) = format!("attachment; filename=\"{}\"", header_safe(&filename)).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

// ============================================================================
// Helpers
// ============================================================================

fn file_to_response(id: &str, file: &FileRecord) -> FileResponse {
    FileResponse {
        file_size_bytes: file.file_size_bytes,
        file_type: file.file_type.clone(),
        id: id.to_string(),
        in_vector_db: file.in_vector_db,
        original_filename: file.original_filename.clone(),
        path: file.path.clone(),
        stored_filename: file.stored_filename.clone(),
        upload_time: file.upload_time.to_rfc3339(),
        uploader: file.uploader.clone(),
    }
}

/// Filename usable inside a quoted Content-Disposition parameter.
fn header_safe(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
