//! Shared test helpers for doc-admin in-crate tests.

use std::sync::Arc;

use crate::api::session::SessionStore;
use crate::backend::LocalBackend;
use crate::config::{Config, ServerConfig, SessionConfig, StorageConfig};
use crate::registry::{EvaluationRegistry, PlaceholderScorer, TestsetStore};
use crate::storage::JsonIndex;
use crate::vector_db::PlaceholderVectorIndex;
use crate::AppState;

/// Create a test AppState backed by local stores in a temporary directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        storage: StorageConfig {
            data_dir: temp_dir.path().join("data"),
            ..Default::default()
        },
        session: SessionConfig::default(),
        vector_collection: "test-documents".to_string(),
        max_upload_size: 1024 * 1024,      // 1MB per file for tests
        max_request_size: 4 * 1024 * 1024, // 4MB per request for tests
    };

    let backend = LocalBackend::open(&config.storage).expect("Failed to open local backend");
    let evaluations = EvaluationRegistry::new(
        JsonIndex::open(config.storage.evaluation_index()).expect("Failed to open eval index"),
        config.storage.evaluations_dir(),
        Arc::new(PlaceholderScorer),
    )
    .expect("Failed to create evaluation registry");
    let testsets =
        TestsetStore::new(config.storage.testset_dir()).expect("Failed to create testset store");

    Arc::new(AppState {
        sessions: SessionStore::new(config.session.ttl_seconds),
        vector_index: Arc::new(PlaceholderVectorIndex::new(
            config.vector_collection.clone(),
        )),
        config,
        backend: Arc::new(backend),
        evaluations,
        testsets,
    })
}
