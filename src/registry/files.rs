use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use super::RegistryError;
use crate::object_store::ObjectStore;
use crate::storage::models::FileRecord;
use crate::storage::JsonIndex;

/// An upload waiting to be registered.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub data: Bytes,
    pub original_filename: String,
    pub mime_type: Option<String>,
    pub uploader: String,
    pub in_vector_db: bool,
}

/// Uploaded files: bytes in an object store, metadata in the JSON file index.
pub struct FileRegistry {
    index: JsonIndex<FileRecord>,
    store: Arc<dyn ObjectStore>,
}

impl FileRegistry {
    pub fn new(index: JsonIndex<FileRecord>, store: Arc<dyn ObjectStore>) -> Self {
        Self { index, store }
    }

    /// Write the bytes, then record them in the index.
    ///
    /// The two writes are not transactional: if the index write fails the bytes stay
    /// behind under their stored filename and the error is returned as-is.
    pub async fn register(&self, file: NewFile) -> Result<(String, FileRecord), RegistryError> {
        let id = uuid::Uuid::new_v4().to_string();
        let stored_filename = stored_filename(&id, &file.original_filename);
        let mime_type = resolve_mime_type(file.mime_type.as_deref(), &file.original_filename);
        let file_size_bytes = file.data.len() as u64;

        self.store.put(&stored_filename, file.data).await?;

        let record = FileRecord {
            original_filename: file.original_filename,
            path: self.store.location(&stored_filename),
            stored_filename,
            upload_time: Utc::now(),
            uploader: file.uploader,
            file_size_bytes,
            file_type: mime_type,
            in_vector_db: file.in_vector_db,
        };

        if let Err(e) = self.index.insert(&id, record.clone()) {
            tracing::error!(
                file_id = %id,
                stored_filename = %record.stored_filename,
                error = %e,
                "Stored file bytes but failed to update the file index"
            );
            return Err(e.into());
        }

        tracing::info!(
            file_id = %id,
            uploader = %record.uploader,
            bytes = file_size_bytes,
            "Registered file"
        );
        Ok((id, record))
    }

    /// All registered files keyed by id; empty before the first upload.
    pub fn list(&self) -> Result<BTreeMap<String, FileRecord>, RegistryError> {
        Ok(self.index.load()?)
    }

    pub fn get(&self, id: &str) -> Result<FileRecord, RegistryError> {
        self.index
            .get(id)?
            .ok_or_else(|| RegistryError::NotFound(format!("File not found: {id}")))
    }

    /// Remove the backing bytes (already missing is fine), then the index entry.
    pub async fn delete(&self, id: &str) -> Result<FileRecord, RegistryError> {
        let record = self.get(id)?;

        self.store.delete(&record.stored_filename).await?;
        self.index.remove(id)?;

        tracing::info!(file_id = %id, "Deleted file");
        Ok(record)
    }

    pub fn set_vector_flag(&self, id: &str, in_vector_db: bool) -> Result<FileRecord, RegistryError> {
        let record = self
            .index
            .update(id, |record| record.in_vector_db = in_vector_db)?
            .ok_or_else(|| RegistryError::NotFound(format!("File not found: {id}")))?;

        tracing::info!(file_id = %id, in_vector_db, "Updated vector DB flag");
        Ok(record)
    }

    /// The stored bytes together with the name they were uploaded under.
    pub async fn fetch_bytes(&self, id: &str) -> Result<(Bytes, String), RegistryError> {
        let record = self.get(id)?;
        let data = self.store.get(&record.stored_filename).await?;
        Ok((data, record.original_filename))
    }
}

/// `<id><.ext>`, keeping the ASCII alphanumeric part of the original extension.
fn stored_filename(id: &str, original_filename: &str) -> String {
    let ext: String = Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if ext.is_empty() {
        id.to_string()
    } else {
        format!("{id}.{ext}")
    }
}

/// Prefer the client's MIME type, falling back to a guess from the filename.
fn resolve_mime_type(client_type: Option<&str>, original_filename: &str) -> String {
    client_type
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(|ct| ct.to_string())
        .or_else(|| {
            mime_guess::from_path(original_filename)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
