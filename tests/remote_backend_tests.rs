//! RemoteBackend against an in-process fake of the external admin API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;

use doc_admin::backend::{AdminBackend, RemoteBackend};
use doc_admin::registry::{NewFile, RegistryError};
use doc_admin::storage::models::FileRecord;

#[derive(Default)]
struct FakeAdmin {
    files: Mutex<BTreeMap<String, (FileRecord, Bytes)>>,
}

type Shared = Arc<FakeAdmin>;

async fn login(Json(body): Json<serde_json::Value>) -> Response {
    if body["username"] == "admin" && body["password"] == "admin" {
        Json(json!({ "authenticated": true })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "bad credentials" }))).into_response()
    }
}

async fn create_user(Json(body): Json<serde_json::Value>) -> Response {
    if body["username"] == "admin" {
        return (StatusCode::CONFLICT, Json(json!({ "detail": "exists" }))).into_response();
    }
    Json(json!({
        "username": body["username"],
        "created_by": body["created_by"],
        "created_at": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

async fn change_password() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "detail": "read-only replica" }))).into_response()
}

async fn get_users() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "database exploded").into_response()
}

async fn delete_user(Path(username): Path<String>) -> Response {
    if username == "jane doe" {
        Json(json!({ "deleted": username })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "detail": "User not found" }))).into_response()
    }
}

async fn upload_file(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut data = Bytes::new();
    let mut filename = String::new();
    let mut uploader = String::new();
    let mut in_vector_db = false;

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or_default() {
            "file" => {
                filename = field.file_name().unwrap_or_default().to_string();
                data = field.bytes().await.unwrap_or_default();
            }
            "uploader" => uploader = field.text().await.unwrap_or_default(),
            "in_vector_db" => in_vector_db = field.text().await.unwrap_or_default() == "true",
            _ => {}
        }
    }

    let id = format!("remote-{}", state.files.lock().unwrap().len() + 1);
    let record = FileRecord {
        original_filename: filename,
        stored_filename: format!("{id}.bin"),
        upload_time: Utc::now(),
        uploader,
        file_size_bytes: data.len() as u64,
        file_type: "application/octet-stream".to_string(),
        in_vector_db,
        path: format!("/remote/{id}.bin"),
    };
    state
        .files
        .lock()
        .unwrap()
        .insert(id.clone(), (record.clone(), data));

    Json(json!({ "file_id": id, "metadata": record })).into_response()
}

async fn list_files(State(state): State<Shared>) -> Json<BTreeMap<String, FileRecord>> {
    let files = state.files.lock().unwrap();
    Json(
        files
            .iter()
            .map(|(id, (record, _))| (id.clone(), record.clone()))
            .collect(),
    )
}

async fn get_file(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.files.lock().unwrap().get(&id) {
        Some((record, _)) => Json(record.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "File not found" }))).into_response(),
    }
}

async fn download_file(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.files.lock().unwrap().get(&id) {
        Some((_, data)) => data.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn add_to_vector_db(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut files = state.files.lock().unwrap();
    match files.get_mut(&id) {
        Some((record, _)) => {
            record.in_vector_db = true;
            Json(record.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_file(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.files.lock().unwrap().remove(&id) {
        Some((record, _)) => Json(record).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "File not found" }))).into_response(),
    }
}

async fn start_fake_admin() -> RemoteBackend {
    let state: Shared = Arc::new(FakeAdmin::default());
    let admin = Router::new()
        .route("/login", post(login))
        .route("/create_user", post(create_user))
        .route("/change_password", post(change_password))
        .route("/get_users", get(get_users))
        .route("/delete_user/:username", delete(delete_user))
        .route("/upload_file", post(upload_file))
        .route("/list_files", get(list_files))
        .route("/get_file/:id", get(get_file))
        .route("/download_file/:id", get(download_file))
        .route("/add_to_vector_db/:id", post(add_to_vector_db))
        .route("/delete_file/:id", delete(delete_file))
        .with_state(state);
    let app = Router::new().nest("/admin", admin);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    RemoteBackend::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_verify_credentials() {
    let backend = start_fake_admin().await;

    assert!(backend.verify_credentials("admin", "admin").await.unwrap());
    assert!(!backend.verify_credentials("admin", "wrong").await.unwrap());
}

#[tokio::test]
async fn test_create_user_conflict_is_duplicate() {
    let backend = start_fake_admin().await;

    let created = backend.create_user("alice", "pw", "admin").await.unwrap();
    assert_eq!(created.username, "alice");
    assert_eq!(created.created_by, "admin");

    let result = backend.create_user("admin", "pw", "admin").await;
    assert!(matches!(result, Err(RegistryError::DuplicateUser(ref u)) if u == "admin"));
}

#[tokio::test]
async fn test_server_error_maps_to_remote() {
    let backend = start_fake_admin().await;

    match backend.list_users().await {
        Err(RegistryError::Remote(msg)) => assert!(msg.contains("database exploded")),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_maps_to_remote() {
    let backend = start_fake_admin().await;

    match backend.change_password("admin", "admin", "n3w").await {
        Err(RegistryError::Remote(msg)) => {
            assert!(msg.contains("403"));
            assert!(msg.contains("read-only replica"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_path_segments_are_encoded() {
    let backend = start_fake_admin().await;

    backend.delete_user("jane doe").await.unwrap();
    match backend.delete_user("ghost").await {
        Err(RegistryError::NotFound(msg)) => assert_eq!(msg, "User not found"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_file_lifecycle() {
    let backend = start_fake_admin().await;

    let (id, record) = backend
        .register_file(NewFile {
            data: Bytes::from_static(b"%PDF-"),
            original_filename: "report.pdf".to_string(),
            mime_type: Some("application/pdf".to_string()),
            uploader: "alice".to_string(),
            in_vector_db: false,
        })
        .await
        .unwrap();
    assert_eq!(record.file_size_bytes, 5);
    assert_eq!(record.uploader, "alice");
    assert!(!record.in_vector_db);

    let files = backend.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.contains_key(&id));

    let flagged = backend.set_vector_flag(&id, true).await.unwrap();
    assert!(flagged.in_vector_db);

    let (data, name) = backend.fetch_file(&id).await.unwrap();
    assert_eq!(&data[..], b"%PDF-");
    assert_eq!(name, "report.pdf");

    let removed = backend.delete_file(&id).await.unwrap();
    assert_eq!(removed.original_filename, "report.pdf");
    assert!(matches!(
        backend.get_file(&id).await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unreachable_api_is_remote_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend =
        RemoteBackend::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    assert!(matches!(
        backend.list_files().await,
        Err(RegistryError::Remote(_))
    ));
}
