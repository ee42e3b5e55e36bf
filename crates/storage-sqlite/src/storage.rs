use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use records_core::{Record, RecordDraft, RecordId};
use records_storage::{RecordStore, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_COLUMNS: &str = "id, name, description, status, email";

/// SQLite-backed record store. Each call runs on the blocking pool against one
/// shared connection.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db dir {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db {}", db_path.display()))?;
        tracing::info!(path = %db_path.display(), "opened sqlite record store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).context("apply schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::unavailable("sqlite connection lock poisoned"))?;
            f(&conn).map_err(StoreError::backend)
        })
        .await
        .map_err(StoreError::unavailable)?
    }
}

fn row_to_record(r: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
        status: r.get(3)?,
        email: r.get(4)?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM records ORDER BY id")?;
            let rows = stmt.query_map([], |r| r.get::<_, RecordId>(0))?;
            rows.collect()
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect()
        })
        .await
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()
        })
        .await
    }

    async fn insert(&self, draft: RecordDraft) -> Result<Record, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO records (name, description, status, email)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {RECORD_COLUMNS}"
                ),
                params![
                    draft.name.as_deref().unwrap_or_default(),
                    draft.description,
                    draft.initial_status(),
                    draft.email.as_deref().unwrap_or_default()
                ],
                row_to_record,
            )
        })
        .await
    }

    async fn upsert(&self, record: Record) -> Result<Record, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO records (id, name, description, status, email)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       description = excluded.description,
                       status = excluded.status,
                       email = excluded.email
                     RETURNING {RECORD_COLUMNS}"
                ),
                params![
                    record.id,
                    record.name,
                    record.description,
                    record.status,
                    record.email
                ],
                row_to_record,
            )
        })
        .await
    }

    async fn exists(&self, id: RecordId) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE id = ?1)",
                params![id],
                |r| r.get::<_, bool>(0),
            )
        })
        .await
    }

    async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let n = conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
    }
}
