//! doc-admin - Internal admin API for uploaded documents and RAG evaluation runs
//!
//! This crate provides:
//! - File upload, listing, download and vector-DB membership toggling
//! - Admin accounts with salted SHA-256 credentials and bearer sessions
//! - Evaluation runs and generated testsets persisted as JSON/CSV files
//! - Swappable backing strategy for users and files (local JSON files or a remote admin API)

pub mod api;
pub mod backend;
pub mod config;
pub mod object_store;
pub mod registry;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod vector_db;

use std::sync::Arc;

use api::session::SessionStore;
use backend::AdminBackend;
use config::Config;
use registry::{EvaluationRegistry, TestsetStore};
use vector_db::VectorIndex;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn AdminBackend>,
    pub evaluations: EvaluationRegistry,
    pub testsets: TestsetStore,
    pub sessions: SessionStore,
    pub vector_index: Arc<dyn VectorIndex>,
}
