mod admin;
mod auth;
mod evaluations;
mod files;
mod testsets;
mod users;

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;

use crate::api::response::ApiError;

pub use admin::{health, vector_db_info};
pub use auth::{login, logout, me};
pub use evaluations::{
    delete_evaluation, get_evaluation, list_evaluations, run_evaluation, upload_evaluation,
};
pub use files::{
    delete_file, download_file, get_file, list_files, set_vector_membership, upload_files,
};
pub use testsets::{create_testset, download_testset, list_testsets};
pub use users::{change_password, create_user, delete_user, list_users};

/// Read a multipart text field, naming the field in the error.
async fn text_field(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field.text().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            multipart_error(e)
        } else {
            ApiError::bad_request(format!("Invalid {name}: {e}"))
        }
    })
}

/// Form-style boolean: `true`/`1`/`on`/`yes` are true, `false`/`0`/`off`/`no`/empty are false.
fn parse_form_bool(value: &str, name: &str) -> Result<bool, ApiError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(ApiError::bad_request(format!(
            "{name} must be true or false, got '{other}'"
        ))),
    }
}

/// Multipart stream failures keep their own status, so a body over the request
/// limit is reported as 413 rather than as malformed input.
fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body exceeds the maximum upload size")
    } else {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    }
}
