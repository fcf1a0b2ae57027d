//! Nutshell Record Store
//!
//! The persisted collection of clinical records the core reads from:
//!
//! - **types**: `ClinicalRecord` and its per-type payloads
//! - **sqlite**: SQLite-backed store
//! - **memory**: in-memory store (tests, one-shot CLI runs)
//! - **notify**: "store changed" broadcast signal
//! - **error**: error types
//!
//! # Architecture
//!
//! ```text
//! Write Path (importers, ingest route):
//!   ClinicalRecord → RecordStore::insert → ChangeNotifier::notify
//!
//! Read Path (event index, graph):
//!   RecordStore::fetch_all_for_user / fetch_range → snapshot Vec<ClinicalRecord>
//! ```

pub mod error;
pub mod memory;
pub mod notify;
pub mod sqlite;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRecordStore;
pub use notify::{ChangeNotifier, StoreChanged};
pub use sqlite::SqliteRecordStore;
pub use types::{ClinicalRecord, GlucoseUnits, RecordKind, RecordType, MMOL_TO_MGDL};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Source of clinical records for the event and graph pipelines
///
/// Reads return owned snapshots so a pipeline run never observes concurrent
/// writes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records belonging to `user_id`
    async fn fetch_all_for_user(&self, user_id: &str) -> StoreResult<Vec<ClinicalRecord>>;

    /// Records for `user_id` with `start_ms <= timestamp < end_ms`, ascending by time
    async fn fetch_range(
        &self,
        user_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<ClinicalRecord>>;

    /// Insert or replace records by id. Returns the number written.
    async fn insert(&self, records: &[ClinicalRecord]) -> StoreResult<usize>;

    /// Total number of records
    async fn count(&self) -> StoreResult<u64>;
}

/// Open the store named by `backend` ("sqlite" or "memory")
pub fn open_store(backend: &str, data_dir: &Path) -> StoreResult<Arc<dyn RecordStore>> {
    match backend.trim().to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteRecordStore::open(data_dir)?)),
        "memory" => Ok(Arc::new(MemoryRecordStore::new())),
        other => Err(StoreError::Unavailable(format!(
            "unknown store backend {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_store_backends() {
        let dir = tempdir().unwrap();

        let sqlite = open_store("sqlite", dir.path()).unwrap();
        assert_eq!(sqlite.count().await.unwrap(), 0);
        assert!(dir.path().join("records.db").exists());

        let memory = open_store("Memory", dir.path()).unwrap();
        assert_eq!(memory.count().await.unwrap(), 0);

        assert!(matches!(
            open_store("postgres", dir.path()),
            Err(StoreError::Unavailable(_))
        ));
    }
}
