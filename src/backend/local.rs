use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::AdminBackend;
use crate::config::StorageConfig;
use crate::object_store::LocalStore;
use crate::registry::{CredentialStore, FileRegistry, NewFile, RegistryError};
use crate::storage::models::{FileRecord, UserSummary};
use crate::storage::JsonIndex;

/// Users and files kept in JSON files under the data directory.
pub struct LocalBackend {
    pub credentials: CredentialStore,
    pub files: FileRegistry,
}

impl LocalBackend {
    pub fn new(credentials: CredentialStore, files: FileRegistry) -> Self {
        Self { credentials, files }
    }

    /// Open the stores laid out under `storage.data_dir`, creating the bootstrap
    /// account on first run.
    pub fn open(storage: &StorageConfig) -> Result<Self, RegistryError> {
        let credentials = CredentialStore::new(JsonIndex::open(storage.users_file())?);
        let object_store = LocalStore::new(storage.files_dir())?;
        let files = FileRegistry::new(
            JsonIndex::open(storage.files_index())?,
            Arc::new(object_store),
        );

        credentials.bootstrap()?;
        Ok(Self::new(credentials, files))
    }
}

#[async_trait]
impl AdminBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, RegistryError> {
        self.credentials.verify(username, password)
    }

    async fn create_user(
        &self,
        username: &str,
        password: &str,
        created_by: &str,
    ) -> Result<UserSummary, RegistryError> {
        self.credentials.create(username, password, created_by)
    }

    async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError> {
        self.credentials
            .change_password(username, old_password, new_password)
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, RegistryError> {
        self.credentials.list()
    }

    async fn delete_user(&self, username: &str) -> Result<(), RegistryError> {
        self.credentials.delete(username)
    }

    async fn register_file(&self, file: NewFile) -> Result<(String, FileRecord), RegistryError> {
        self.files.register(file).await
    }

    async fn list_files(&self) -> Result<BTreeMap<String, FileRecord>, RegistryError> {
        self.files.list()
    }

    async fn get_file(&self, id: &str) -> Result<FileRecord, RegistryError> {
        self.files.get(id)
    }

    async fn delete_file(&self, id: &str) -> Result<FileRecord, RegistryError> {
        self.files.delete(id).await
    }

    async fn set_vector_flag(
        &self,
        id: &str,
        in_vector_db: bool,
    ) -> Result<FileRecord, RegistryError> {
        self.files.set_vector_flag(id, in_vector_db)
    }

    async fn fetch_file(&self, id: &str) -> Result<(Bytes, String), RegistryError> {
        self.files.fetch_bytes(id).await
    }
}
