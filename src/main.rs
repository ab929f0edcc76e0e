use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_admin::{
    api::{self, session::SessionStore},
    backend::{AdminBackend, LocalBackend, RemoteBackend},
    config::{BackendKind, Config},
    registry::{EvaluationRegistry, PlaceholderScorer, TestsetStore},
    storage::JsonIndex,
    vector_db::PlaceholderVectorIndex,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "doc-admin starting");

    let config = Config::load()?;
    let data_dir = &config.storage.data_dir;
    std::fs::create_dir_all(data_dir)?;
    info!("Data directory: {}", data_dir.display());

    // Users and files live either in local JSON files or behind the remote admin API
    let mut vector_members = Vec::new();
    let backend: Arc<dyn AdminBackend> = match config.storage.backend {
        BackendKind::Local => {
            let backend = LocalBackend::open(&config.storage)?;
            vector_members = backend
                .files
                .list()?
                .into_iter()
                .filter(|(_, record)| record.in_vector_db)
                .map(|(id, _)| id)
                .collect();
            info!("Using local backend at: {}", data_dir.display());
            Arc::new(backend)
        }
        BackendKind::Remote => {
            let url = config
                .storage
                .remote_api_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("REMOTE_API_URL is required for remote backend"))?;
            let backend = RemoteBackend::new(
                url,
                Duration::from_secs(config.storage.remote_timeout_seconds),
            )?;
            info!("Using remote admin API at: {}", url);
            Arc::new(backend)
        }
    };

    let evaluations = EvaluationRegistry::new(
        JsonIndex::open(config.storage.evaluation_index())?,
        config.storage.evaluations_dir(),
        Arc::new(PlaceholderScorer),
    )?;
    let testsets = TestsetStore::new(config.storage.testset_dir())?;
    let vector_index = PlaceholderVectorIndex::new(config.vector_collection.clone())
        .with_members(vector_members);

    let state = Arc::new(AppState {
        config: config.clone(),
        backend,
        evaluations,
        testsets,
        sessions: SessionStore::new(config.session.ttl_seconds),
        vector_index: Arc::new(vector_index),
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
