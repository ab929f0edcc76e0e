//! Vector database membership for uploaded files.
//!
//! Only the placeholder implementation exists: it records which files are members
//! but does no text extraction or embedding.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::storage::models::FileRecord;

#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("Vector index error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: u32,
    pub index_type: String,
    pub metric_type: String,
    pub num_entities: u64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add_file(&self, file_id: &str, record: &FileRecord) -> Result<(), VectorIndexError>;
    async fn remove_file(&self, file_id: &str) -> Result<(), VectorIndexError>;
    async fn collection_info(&self) -> Result<CollectionInfo, VectorIndexError>;
}

pub struct PlaceholderVectorIndex {
    collection: String,
    members: Mutex<HashSet<String>>,
}

impl PlaceholderVectorIndex {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            members: Mutex::new(HashSet::new()),
        }
    }

    /// Seed membership, e.g. from the `in_vector_db` flags of the file index at startup.
    pub fn with_members<I: IntoIterator<Item = String>>(self, ids: I) -> Self {
        self.members_mut().extend(ids);
        self
    }

    fn members_mut(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.members
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VectorIndex for PlaceholderVectorIndex {
    async fn add_file(&self, file_id: &str, record: &FileRecord) -> Result<(), VectorIndexError> {
        self.members_mut().insert(file_id.to_string());
        tracing::debug!(
            file_id = %file_id,
            filename = %record.original_filename,
            collection = %self.collection,
            "Added file to vector collection"
        );
        Ok(())
    }

    async fn remove_file(&self, file_id: &str) -> Result<(), VectorIndexError> {
        self.members_mut().remove(file_id);
        tracing::debug!(file_id = %file_id, collection = %self.collection, "Removed file from vector collection");
        Ok(())
    }

    async fn collection_info(&self) -> Result<CollectionInfo, VectorIndexError> {
        Ok(CollectionInfo {
            name: self.collection.clone(),
            dimension: 1536,
            index_type: "HNSW".to_string(),
            metric_type: "L2".to_string(),
            num_entities: self.members_mut().len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FileRecord {
        FileRecord {
            original_filename: "notes.txt".to_string(),
            stored_filename: "id.txt".to_string(),
            upload_time: chrono::Utc::now(),
            uploader: "admin".to_string(),
            file_size_bytes: 3,
            file_type: "text/plain".to_string(),
            in_vector_db: false,
            path: "/tmp/id.txt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_membership_drives_entity_count() {
        let index = PlaceholderVectorIndex::new("documents").with_members(["seed".to_string()]);
        assert_eq!(index.collection_info().await.unwrap().num_entities, 1);

        index.add_file("a", &record()).await.unwrap();
        index.add_file("a", &record()).await.unwrap();
        assert_eq!(index.collection_info().await.unwrap().num_entities, 2);

        index.remove_file("a").await.unwrap();
        index.remove_file("missing").await.unwrap();
        let info = index.collection_info().await.unwrap();
        assert_eq!(info.num_entities, 1);
        assert_eq!(info.name, "documents");
    }
}
