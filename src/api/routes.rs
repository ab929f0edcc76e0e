use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_request_size as usize;

    Router::new()
        // Auth
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        // Users
        .route("/users", get(handlers::list_users))
        .route("/users", post(handlers::create_user))
        .route("/users/me/password", put(handlers::change_password))
        .route("/users/:username", delete(handlers::delete_user))
        // Files
        .route("/files", get(handlers::list_files))
        .route(
            "/files",
            post(handlers::upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/:id", get(handlers::get_file))
        .route("/files/:id", delete(handlers::delete_file))
        .route("/files/:id/download", get(handlers::download_file))
        .route("/files/:id/vector", put(handlers::set_vector_membership))
        .route("/vector-db", get(handlers::vector_db_info))
        // Evaluations
        .route("/evaluations", get(handlers::list_evaluations))
        .route("/evaluations", post(handlers::run_evaluation))
        .route(
            "/evaluations/upload",
            post(handlers::upload_evaluation).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/evaluations/:id", get(handlers::get_evaluation))
        .route("/evaluations/:id", delete(handlers::delete_evaluation))
        // Testsets
        .route("/testsets", get(handlers::list_testsets))
        .route("/testsets", post(handlers::create_testset))
        .route("/testsets/:name", get(handlers::download_testset))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
