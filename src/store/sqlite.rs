//! SQLite Record Store
//!
//! Persists records as JSON payloads keyed by id, with indexed user and
//! timestamp columns for range reads.
//!
//! # Design Notes
//! - One connection guarded by a mutex; reads copy rows out before returning
//! - Records without an id are kept (the aggregator reports them) but cannot
//!   be replaced
//! - Rows whose payload no longer parses are skipped with a warning

use crate::store::{ClinicalRecord, RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQLite-backed record store
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteRecordStore {
    /// Create or open the store at `data_dir/records.db`
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("records.db");

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Self::init_schema(&conn)?;

        tracing::debug!(path = ?path, "Opened record store");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open a private in-memory database
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                record_type TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            DROP INDEX IF EXISTS idx_records_id;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_records_user_id
                ON records(user_id, id) WHERE id <> '';
            CREATE INDEX IF NOT EXISTS idx_records_user_time ON records(user_id, timestamp);
            ",
        )?;
        Ok(())
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(format!("record store mutex poisoned: {}", e)))
    }

    fn decode_rows(payloads: Vec<String>) -> Vec<ClinicalRecord> {
        payloads
            .into_iter()
            .filter_map(|payload| match serde_json::from_str::<ClinicalRecord>(&payload) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable record row");
                    None
                }
            })
            .collect()
    }

    fn query_payloads(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<String>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut payloads = Vec::new();
        for row in rows {
            payloads.push(row?);
        }
        Ok(payloads)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn fetch_all_for_user(&self, user_id: &str) -> StoreResult<Vec<ClinicalRecord>> {
        let payloads = {
            let conn = self.lock()?;
            Self::query_payloads(
                &conn,
                "SELECT payload FROM records WHERE user_id = ? ORDER BY timestamp, seq",
                params![user_id],
            )?
        };
        Ok(Self::decode_rows(payloads))
    }

    async fn fetch_range(
        &self,
        user_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<ClinicalRecord>> {
        let payloads = {
            let conn = self.lock()?;
            Self::query_payloads(
                &conn,
                "SELECT payload FROM records
                 WHERE user_id = ? AND timestamp >= ? AND timestamp < ?
                 ORDER BY timestamp, seq",
                params![user_id, start_ms, end_ms],
            )?
        };
        Ok(Self::decode_rows(payloads))
    }

    async fn insert(&self, records: &[ClinicalRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO records (id, user_id, timestamp, record_type, payload)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for record in records {
                let payload = serde_json::to_string(record)?;
                stmt.execute(params![
                    record.id,
                    record.user_id,
                    record.timestamp,
                    record.record_type().as_str(),
                    payload
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(count = records.len(), "Inserted records");
        Ok(records.len())
    }

    async fn count(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordKind;
    use tempfile::tempdir;

    fn glucose(id: &str, ts: i64, value: f64) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Glucose {
                value: Some(value),
                units: Default::default(),
                source: None,
            },
        )
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .insert(&[glucose("g2", 2000, 110.0), glucose("g1", 1000, 100.0)])
            .await
            .unwrap();

        let records = store.fetch_all_for_user("u1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "g1");
        assert_eq!(records[1].id, "g2");
        assert!(store.fetch_all_for_user("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_by_id() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert(&[glucose("g1", 1000, 100.0)]).await.unwrap();
        store.insert(&[glucose("g1", 1000, 150.0)]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let records = store.fetch_all_for_user("u1").await.unwrap();
        assert_eq!(records[0], glucose("g1", 1000, 150.0));
    }

    #[tokio::test]
    async fn test_same_id_for_two_users() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let mut bob = glucose("m1", 2000, 120.0);
        bob.user_id = "bob".to_string();
        let mut alice = glucose("m1", 1000, 100.0);
        alice.user_id = "alice".to_string();

        store.insert(&[alice.clone()]).await.unwrap();
        store.insert(&[bob]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.fetch_all_for_user("alice").await.unwrap(), vec![alice]);
        assert_eq!(store.fetch_all_for_user("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_records_without_id_are_kept() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .insert(&[glucose("", 1000, 90.0), glucose("", 2000, 95.0)])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_range() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .insert(&[
                glucose("a", 1000, 1.0),
                glucose("b", 2000, 2.0),
                glucose("c", 3000, 3.0),
            ])
            .await
            .unwrap();

        let records = store.fetch_range("u1", 1500, 3000).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "b");
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempdir().unwrap();

        {
            let store = SqliteRecordStore::open(dir.path()).unwrap();
            store.insert(&[glucose("g1", 1000, 100.0)]).await.unwrap();
        }

        {
            let store = SqliteRecordStore::open(dir.path()).unwrap();
            assert_eq!(store.count().await.unwrap(), 1);
        }
    }
}
