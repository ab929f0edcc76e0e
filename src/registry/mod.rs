//! Local registries behind the admin API: uploaded files, admin accounts,
//! evaluation runs and generated testsets.

mod credentials;
mod evaluations;
mod files;
mod queries;
mod testsets;

pub use credentials::{hash_password, CredentialStore, BOOTSTRAP_PASSWORD, BOOTSTRAP_USERNAME};
pub use evaluations::{EvaluationRegistry, PlaceholderScorer, ScoreReport, Scorer};
pub use files::{FileRegistry, NewFile};
pub use queries::parse_queries;
pub use testsets::{TestsetFile, TestsetStore};

use thiserror::Error;

use crate::object_store::ObjectStoreError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    NotFound(String),
    #[error("Username '{0}' already exists")]
    DuplicateUser(String),
    #[error("{0}")]
    Auth(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Remote API error: {0}")]
    Remote(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        RegistryError::Storage(e.to_string())
    }
}

impl From<ObjectStoreError> for RegistryError {
    fn from(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::NotFound(key) => {
                RegistryError::NotFound(format!("File data not found: {key}"))
            }
            ObjectStoreError::Io(e) => RegistryError::Storage(e.to_string()),
        }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        RegistryError::Storage(e.to_string())
    }
}
