//! Video record datastore
//!
//! The pipeline only fetches a record by ID and writes the whole record back.
//! `update` is a plain overwrite: two concurrent uploads for one video race
//! and the last write wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Record store errors
#[derive(Error, Debug)]
pub enum RecordStoreError {
    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Failed to load seed records: {0}")]
    Seed(String),
}

/// A video owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

impl VideoRecord {
    pub fn new(user_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: title.into(),
            description: description.into(),
            user_id,
            thumbnail_url: None,
            video_url: None,
        }
    }
}

/// Fetch/overwrite access to video records
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_video(&self, id: Uuid) -> Result<VideoRecord, RecordStoreError>;

    async fn update_video(&self, record: &VideoRecord) -> Result<(), RecordStoreError>;
}

/// Concurrent in-memory record store
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<DashMap<Uuid, VideoRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, replacing any with the same ID
    pub fn insert(&self, record: VideoRecord) {
        self.records.insert(record.id, record);
    }

    /// Build a store from a JSON array of records
    pub async fn from_seed_file(path: &Path) -> Result<Self, RecordStoreError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| RecordStoreError::Seed(format!("{}: {}", path.display(), e)))?;
        let records: Vec<VideoRecord> =
            serde_json::from_slice(&data).map_err(|e| RecordStoreError::Seed(e.to_string()))?;

        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        tracing::info!(path = %path.display(), count = store.len(), "Loaded seed records");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_video(&self, id: Uuid) -> Result<VideoRecord, RecordStoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RecordStoreError::NotFound(id))
    }

    async fn update_video(&self, record: &VideoRecord) -> Result<(), RecordStoreError> {
        match self.records.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record.clone();
                Ok(())
            }
            None => Err(RecordStoreError::NotFound(record.id)),
        }
    }
}
