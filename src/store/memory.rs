//! In-memory record store

use crate::store::{ClinicalRecord, RecordStore, StoreResult};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Record store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<ClinicalRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records
    pub fn with_records(records: Vec<ClinicalRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Remove all records
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_all_for_user(&self, user_id: &str) -> StoreResult<Vec<ClinicalRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn fetch_range(
        &self,
        user_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<ClinicalRecord>> {
        let records = self.records.read().await;
        let mut result: Vec<ClinicalRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp >= start_ms && r.timestamp < end_ms)
            .cloned()
            .collect();
        result.sort_by_key(|r| r.timestamp);
        Ok(result)
    }

    async fn insert(&self, new_records: &[ClinicalRecord]) -> StoreResult<usize> {
        let mut records = self.records.write().await;
        for record in new_records {
            match records.iter_mut().find(|r| {
                !record.id.is_empty() && r.id == record.id && r.user_id == record.user_id
            }) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        Ok(new_records.len())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordKind;

    fn bolus(id: &str, user: &str, ts: i64) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            user,
            ts,
            RecordKind::Bolus {
                normal: Some(1.0),
                extended: None,
                duration_ms: None,
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_filters_by_user() {
        let store = MemoryRecordStore::with_records(vec![
            bolus("a", "u1", 1),
            bolus("b", "u2", 2),
        ]);
        let records = store.fetch_all_for_user("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[tokio::test]
    async fn test_fetch_range_sorted_half_open() {
        let store = MemoryRecordStore::with_records(vec![
            bolus("c", "u1", 300),
            bolus("a", "u1", 100),
            bolus("b", "u1", 200),
        ]);
        let records = store.fetch_range("u1", 100, 300).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_insert_replaces_by_id() {
        let store = MemoryRecordStore::new();
        store.insert(&[bolus("a", "u1", 1)]).await.unwrap();
        store.insert(&[bolus("a", "u1", 5)]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let records = store.fetch_all_for_user("u1").await.unwrap();
        assert_eq!(records[0].timestamp, 5);
    }

    #[tokio::test]
    async fn test_same_id_for_two_users() {
        let store = MemoryRecordStore::new();
        store.insert(&[bolus("m1", "alice", 1)]).await.unwrap();
        store.insert(&[bolus("m1", "bob", 2)]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.fetch_all_for_user("alice").await.unwrap().len(), 1);
        assert_eq!(store.fetch_all_for_user("bob").await.unwrap()[0].timestamp, 2);
    }
}
