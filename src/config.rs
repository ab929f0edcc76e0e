use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    /// Name reported for the vector collection
    pub vector_collection: String,
    /// Maximum size of a single uploaded file in bytes
    pub max_upload_size: u64,
    /// Maximum size of a whole upload request body in bytes
    pub max_request_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Root directory for every local JSON store and the uploaded bytes
    pub data_dir: PathBuf,
    /// Base URL of the external admin API (required when backend is remote)
    pub remote_api_url: Option<String>,
    pub remote_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            data_dir: PathBuf::from("./data"),
            remote_api_url: None,
            remote_timeout_seconds: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 8 * 60 * 60,
        }
    }
}

impl StorageConfig {
    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn files_index(&self) -> PathBuf {
        self.data_dir.join("files_index.json")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.data_dir.join("files")
    }

    pub fn evaluation_index(&self) -> PathBuf {
        self.data_dir.join("evaluation_index.json")
    }

    pub fn evaluations_dir(&self) -> PathBuf {
        self.data_dir.join("evaluations")
    }

    pub fn testset_dir(&self) -> PathBuf {
        self.data_dir.join("testset_generation")
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let backend = match std::env::var("BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "remote" => BackendKind::Remote,
            _ => BackendKind::Local,
        };

        let remote_api_url = std::env::var("REMOTE_API_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let remote_timeout_seconds = std::env::var("REMOTE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200 * 1024 * 1024); // 200MB

        let max_request_size = std::env::var("MAX_REQUEST_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024 * 1024 * 1024); // 1GB

        let ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8 * 60 * 60);

        let vector_collection =
            std::env::var("VECTOR_COLLECTION").unwrap_or_else(|_| "documents".to_string());

        let config = Config {
            server: ServerConfig { bind_address },
            storage: StorageConfig {
                backend,
                data_dir: PathBuf::from(data_dir),
                remote_api_url,
                remote_timeout_seconds,
            },
            session: SessionConfig { ttl_seconds },
            vector_collection,
            max_upload_size,
            max_request_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == BackendKind::Remote && self.storage.remote_api_url.is_none() {
            return Err(ConfigError::ValidationError(
                "REMOTE_API_URL is required when BACKEND=remote".to_string(),
            ));
        }

        if self.session.ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.max_request_size < self.max_upload_size {
            return Err(ConfigError::ValidationError(
                "MAX_REQUEST_SIZE must be at least MAX_UPLOAD_SIZE".to_string(),
            ));
        }

        if self.storage.backend == BackendKind::Remote {
            tracing::warn!(
                "Remote backend selected. Evaluations and testsets are still stored under {}",
                self.storage.data_dir.display()
            );
        }

        Ok(())
    }
}
