use crate::DbError;
use crate::repository::{RemoteLedger, Storage, validate_key};
use async_trait::async_trait;
use core_types::{DualModeRecord, StoredRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Keeps records in memory, serialized as JSON so reads go through the same
/// shape detection as the file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw JSON document, e.g. a record in the legacy shape.
    pub async fn insert_raw(&self, user: &str, json: impl Into<String>) {
        self.records.lock().await.insert(user.to_string(), json.into());
    }

    /// The raw JSON document last written for `user`.
    pub async fn raw(&self, user: &str) -> Option<String> {
        self.records.lock().await.get(user).cloned()
    }

    async fn read(&self, user: &str) -> Result<Option<StoredRecord>, DbError> {
        validate_key(user)?;
        match self.records.lock().await.get(user) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn load(&self, user: &str) -> Result<Option<StoredRecord>, DbError> {
        self.read(user).await
    }

    async fn save(&self, record: &DualModeRecord) -> Result<(), DbError> {
        validate_key(&record.username)?;
        let json = serde_json::to_string(record)?;
        self.records.lock().await.insert(record.username.clone(), json);
        Ok(())
    }
}

#[async_trait]
impl RemoteLedger for MemoryStore {
    async fn fetch_remote(&self, user: &str) -> Result<Option<StoredRecord>, DbError> {
        self.read(user).await
    }
}
