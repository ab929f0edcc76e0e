use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::AdminBackend;
use crate::registry::{NewFile, RegistryError};
use crate::storage::models::{FileRecord, UserSummary};

/// Client for the external admin API that owns users and files.
pub struct RemoteBackend {
    base_url: Url,
    client: Client,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    authenticated: bool,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    username: &'a str,
    password: &'a str,
    created_by: &'a str,
}

#[derive(Serialize)]
struct ChangePasswordRequest<'a> {
    username: &'a str,
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    file_id: String,
    metadata: FileRecord,
}

impl RemoteBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RegistryError::Invalid(format!("invalid remote API URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::Invalid(format!(
                "remote API URL cannot be a base: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(remote_error)?;

        Ok(Self { base_url, client })
    }

    /// `<base>/admin/<segments...>`, with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("admin").extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, RegistryError> {
        let resp = self
            .client
            .get(self.endpoint(segments))
            .send()
            .await
            .map_err(remote_error)?;
        let resp = check_status(resp).await?;
        resp.json().await.map_err(remote_error)
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: Option<&B>) -> Result<T, RegistryError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint(segments));
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await.map_err(remote_error)?;
        let resp = check_status(resp).await?;
        resp.json().await.map_err(remote_error)
    }

    async fn delete_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, RegistryError> {
        let resp = self
            .client
            .delete(self.endpoint(segments))
            .send()
            .await
            .map_err(remote_error)?;
        let resp = check_status(resp).await?;
        resp.json().await.map_err(remote_error)
    }
}

#[async_trait]
impl AdminBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, RegistryError> {
        let result: Result<LoginResponse, _> = self
            .post_json(&["login"], Some(&LoginRequest { username, password }))
            .await;

        match result {
            Ok(resp) => Ok(resp.authenticated),
            Err(RegistryError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_user(
        &self,
        username: &str,
        password: &str,
        created_by: &str,
    ) -> Result<UserSummary, RegistryError> {
        let body = CreateUserRequest {
            username,
            password,
            created_by,
        };
        let resp = self
            .client
            .post(self.endpoint(&["create_user"]))
            .json(&body)
            .send()
            .await
            .map_err(remote_error)?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(RegistryError::DuplicateUser(username.to_string()));
        }

        let resp = check_status(resp).await?;
        resp.json().await.map_err(remote_error)
    }

    async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError> {
        let body = ChangePasswordRequest {
            username,
            old_password,
            new_password,
        };
        let _: serde_json::Value = self.post_json(&["change_password"], Some(&body)).await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, RegistryError> {
        self.get_json(&["get_users"]).await
    }

    async fn delete_user(&self, username: &str) -> Result<(), RegistryError> {
        let _: serde_json::Value = self.delete_json(&["delete_user", username]).await?;
        Ok(())
    }

    async fn register_file(&self, file: NewFile) -> Result<(String, FileRecord), RegistryError> {
        let mut part =
            reqwest::multipart::Part::bytes(file.data.to_vec()).file_name(file.original_filename);
        if let Some(mime_type) = file.mime_type {
            part = part.mime_str(&mime_type).map_err(remote_error)?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("uploader", file.uploader)
            .text("in_vector_db", file.in_vector_db.to_string());

        let resp = self
            .client
            .post(self.endpoint(&["upload_file"]))
            .multipart(form)
            .send()
            .await
            .map_err(remote_error)?;
        let resp = check_status(resp).await?;
        let upload: UploadResponse = resp.json().await.map_err(remote_error)?;

        tracing::info!(file_id = %upload.file_id, "Uploaded file to remote admin API");
        Ok((upload.file_id, upload.metadata))
    }

    async fn list_files(&self) -> Result<BTreeMap<String, FileRecord>, RegistryError> {
        self.get_json(&["list_files"]).await
    }

    async fn get_file(&self, id: &str) -> Result<FileRecord, RegistryError> {
        self.get_json(&["get_file", id]).await
    }

    async fn delete_file(&self, id: &str) -> Result<FileRecord, RegistryError> {
        self.delete_json(&["delete_file", id]).await
    }

    async fn set_vector_flag(
        &self,
        id: &str,
        in_vector_db: bool,
    ) -> Result<FileRecord, RegistryError> {
        let action = if in_vector_db {
            "add_to_vector_db"
        } else {
            "remove_from_vector_db"
        };
        self.post_json::<(), _>(&[action, id], None).await
    }

    async fn fetch_file(&self, id: &str) -> Result<(Bytes, String), RegistryError> {
        let record = self.get_file(id).await?;

        let resp = self
            .client
            .get(self.endpoint(&["download_file", id]))
            .send()
            .await
            .map_err(remote_error)?;
        let resp = check_status(resp).await?;
        let data = resp.bytes().await.map_err(remote_error)?;

        Ok((data, record.original_filename))
    }
}

/// Pass 2xx responses through; turn everything else into a `RegistryError`.
async fn check_status(resp: Response) -> Result<Response, RegistryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::NOT_FOUND => RegistryError::NotFound(message),
        StatusCode::UNAUTHORIZED => RegistryError::Auth(message),
        _ => RegistryError::Remote(format!("{status}: {message}")),
    })
}

/// Pull a human-readable message out of an error body (`{"detail": ...}`,
/// `{"message": ...}`, or plain text).
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }

    Some(body.chars().take(200).collect())
}

fn remote_error(e: reqwest::Error) -> RegistryError {
    RegistryError::Remote(e.to_string())
}
