use crate::DbError;
use crate::repository::{RemoteLedger, Storage, validate_key};
use async_trait::async_trait;
use core_types::{DualModeRecord, StoredRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores each user's record as `<root>/<user>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user: &str) -> Result<PathBuf, DbError> {
        validate_key(user)?;
        Ok(self.root.join(format!("{user}.json")))
    }

    async fn read(&self, user: &str) -> Result<Option<StoredRecord>, DbError> {
        let path = self.path_for(user)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: StoredRecord = serde_json::from_slice(&bytes)?;
        if record.is_legacy() {
            tracing::debug!(user, path = %path.display(), "found record in a legacy shape");
        }
        Ok(Some(record))
    }
}

#[async_trait]
impl Storage for FileStore {
    async fn load(&self, user: &str) -> Result<Option<StoredRecord>, DbError> {
        self.read(user).await
    }

    /// Writes to a temporary sibling and renames it over the target, so a
    /// reader never sees a half-written record.
    async fn save(&self, record: &DualModeRecord) -> Result<(), DbError> {
        let path = self.path_for(&record.username)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let body = serde_json::to_vec_pretty(record)?;
        let tmp = self.root.join(format!(".{}.{}.tmp", record.username, Uuid::new_v4()));
        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::trace!(user = %record.username, bytes = body.len(), "record saved");
        Ok(())
    }
}

#[async_trait]
impl RemoteLedger for FileStore {
    async fn fetch_remote(&self, user: &str) -> Result<Option<StoredRecord>, DbError> {
        self.read(user).await
    }
}
