//! The two interchangeable homes for users and files: local JSON files, or a
//! remote admin API that owns them.

mod local;
mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::registry::{NewFile, RegistryError};
use crate::storage::models::{FileRecord, UserSummary};

/// User and file operations the admin API forwards to its backing strategy.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Short name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    async fn verify_credentials(&self, username: &str, password: &str)
        -> Result<bool, RegistryError>;
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        created_by: &str,
    ) -> Result<UserSummary, RegistryError>;
    async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError>;
    async fn list_users(&self) -> Result<Vec<UserSummary>, RegistryError>;
    async fn delete_user(&self, username: &str) -> Result<(), RegistryError>;

    async fn register_file(&self, file: NewFile) -> Result<(String, FileRecord), RegistryError>;
    async fn list_files(&self) -> Result<BTreeMap<String, FileRecord>, RegistryError>;
    async fn get_file(&self, id: &str) -> Result<FileRecord, RegistryError>;
    /// Returns the record that was removed.
    async fn delete_file(&self, id: &str) -> Result<FileRecord, RegistryError>;
    async fn set_vector_flag(&self, id: &str, in_vector_db: bool)
        -> Result<FileRecord, RegistryError>;
    /// File bytes and the name they were uploaded under.
    async fn fetch_file(&self, id: &str) -> Result<(Bytes, String), RegistryError>;
}
