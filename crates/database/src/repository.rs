use crate::DbError;
use async_trait::async_trait;
use core_types::{DualModeRecord, StoredRecord};

/// The durable local copy of a user's record.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the stored record in whichever shape it was written, or `None`
    /// when the user has never been saved.
    async fn load(&self, user: &str) -> Result<Option<StoredRecord>, DbError>;

    /// Upserts the record. Always writes the dual-mode shape.
    async fn save(&self, record: &DualModeRecord) -> Result<(), DbError>;
}

/// A possibly stale replica of the same records, e.g. another device's copy.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
    async fn fetch_remote(&self, user: &str) -> Result<Option<StoredRecord>, DbError>;
}

/// Rejects keys that could escape a store's namespace.
pub(crate) fn validate_key(user: &str) -> Result<(), DbError> {
    let ok = !user.is_empty()
        && user
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        && !user.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(DbError::InvalidKey(user.to_string()))
    }
}
