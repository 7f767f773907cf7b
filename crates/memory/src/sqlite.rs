//! SQLite persistence for passages, structured records, and conversation
//! turns.
//!
//! One database file holds three tables:
//! - `passages`: FAQ text with its embedding as a little-endian f32 blob
//! - `records`: one JSON field map per `(record_type, owner_id)`
//! - `turns`: append-only session logs ordered by an autoincrement sequence
//!
//! Nearest-neighbour ranking loads a partition's embeddings and scores them
//! in Rust with cosine similarity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::error::{MemoryError, RecordError, SearchError};
use folio_core::memory::{ConversationStore, SessionId, Turn, TurnRole};
use folio_core::record::{RecordStore, RecordType, StructuredRecord};
use folio_core::search::{Passage, PassageMatch, PassageMetadata, VectorStore};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::vector::{blob_to_embedding, embedding_to_blob, rank_passages};

/// A shared connection pool with the Folio schema applied.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, MemoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create database directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let db = Self::connect(options, 4).await?;
        info!(path = %path.display(), "SQLite database initialized");
        Ok(db)
    }

    /// A private in-process database. Uses a single connection, since every
    /// `:memory:` connection would otherwise see its own empty database.
    pub async fn open_in_memory() -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite URL: {e}")))?;
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max: u32) -> Result<Self, MemoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        let statements = [
            (
                "passages table",
                r#"
                CREATE TABLE IF NOT EXISTS passages (
                    id          TEXT PRIMARY KEY,
                    partition   TEXT NOT NULL,
                    text        TEXT NOT NULL,
                    embedding   BLOB NOT NULL,
                    created_at  TEXT NOT NULL,
                    extra       TEXT NOT NULL DEFAULT '{}'
                )
                "#,
            ),
            (
                "partition index",
                "CREATE INDEX IF NOT EXISTS idx_passages_partition ON passages(partition)",
            ),
            (
                "records table",
                r#"
                CREATE TABLE IF NOT EXISTS records (
                    record_type TEXT NOT NULL,
                    owner_id    TEXT NOT NULL,
                    fields      TEXT NOT NULL,
                    updated_at  TEXT NOT NULL,
                    PRIMARY KEY (record_type, owner_id)
                )
                "#,
            ),
            (
                "turns table",
                r#"
                CREATE TABLE IF NOT EXISTS turns (
                    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id  TEXT NOT NULL,
                    role        TEXT NOT NULL,
                    content     TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                )
                "#,
            ),
            (
                "session index",
                "CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, seq)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| MemoryError::MigrationFailed(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }

    pub fn vectors(&self) -> SqliteVectorStore {
        SqliteVectorStore { db: self.clone() }
    }

    pub fn records(&self) -> SqliteRecordStore {
        SqliteRecordStore { db: self.clone() }
    }

    pub fn conversations(&self) -> SqliteConversationStore {
        SqliteConversationStore { db: self.clone() }
    }

    /// Close the pool. Stores handed out earlier stop working.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// --- passages ---

pub struct SqliteVectorStore {
    db: SqliteDatabase,
}

impl SqliteVectorStore {
    fn row_to_passage(row: &SqliteRow) -> Result<Passage, SearchError> {
        let get = |e: sqlx::Error| SearchError::Backend(format!("passage row: {e}"));
        let id: String = row.try_get("id").map_err(get)?;
        let partition: String = row.try_get("partition").map_err(get)?;
        let text: String = row.try_get("text").map_err(get)?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(get)?;
        let created_at: String = row.try_get("created_at").map_err(get)?;
        let extra: String = row.try_get("extra").map_err(get)?;

        Ok(Passage {
            id: id.clone(),
            text,
            embedding: blob_to_embedding(&blob),
            metadata: PassageMetadata {
                document_type: partition,
                doc_id: id,
                created_at: parse_timestamp(&created_at),
                extra: serde_json::from_str(&extra).unwrap_or_default(),
            },
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, passage: Passage) -> Result<(), SearchError> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT length(embedding) FROM passages WHERE partition = ?1 AND id != ?2 LIMIT 1",
        )
        .bind(&passage.metadata.document_type)
        .bind(&passage.id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(|e| SearchError::Backend(format!("dimension probe: {e}")))?;
        if let Some(bytes) = existing {
            let expected = bytes as usize / 4;
            if expected != passage.embedding.len() {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: passage.embedding.len(),
                });
            }
        }

        let extra = serde_json::to_string(&passage.metadata.extra)
            .map_err(|e| SearchError::Backend(format!("metadata serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO passages (id, partition, text, embedding, created_at, extra)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                partition = excluded.partition,
                text = excluded.text,
                embedding = excluded.embedding,
                created_at = excluded.created_at,
                extra = excluded.extra
            "#,
        )
        .bind(&passage.id)
        .bind(&passage.metadata.document_type)
        .bind(&passage.text)
        .bind(embedding_to_blob(&passage.embedding))
        .bind(passage.metadata.created_at.to_rfc3339())
        .bind(&extra)
        .execute(&self.db.pool)
        .await
        .map_err(|e| SearchError::Backend(format!("INSERT failed: {e}")))?;

        debug!(doc_id = %passage.id, "Stored passage");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        partition: &str,
        top_k: usize,
    ) -> Result<Vec<PassageMatch>, SearchError> {
        let rows = sqlx::query("SELECT * FROM passages WHERE partition = ?1")
            .bind(partition)
            .fetch_all(&self.db.pool)
            .await
            .map_err(|e| SearchError::Backend(format!("Vector scan: {e}")))?;

        let passages = rows
            .iter()
            .map(Self::row_to_passage)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank_passages(&passages, vector, partition, top_k))
    }

    async fn get(&self, id: &str) -> Result<Option<Passage>, SearchError> {
        let row = sqlx::query("SELECT * FROM passages WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(|e| SearchError::Backend(format!("GET by ID: {e}")))?;

        row.as_ref().map(Self::row_to_passage).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, SearchError> {
        let result = sqlx::query("DELETE FROM passages WHERE id = ?1")
            .bind(id)
            .execute(&self.db.pool)
            .await
            .map_err(|e| SearchError::Backend(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, partition: &str) -> Result<usize, SearchError> {
        let cnt: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages WHERE partition = ?1")
            .bind(partition)
            .fetch_one(&self.db.pool)
            .await
            .map_err(|e| SearchError::Backend(format!("COUNT: {e}")))?;

        Ok(cnt as usize)
    }

    async fn clear(&self, partition: &str) -> Result<usize, SearchError> {
        let result = sqlx::query("DELETE FROM passages WHERE partition = ?1")
            .bind(partition)
            .execute(&self.db.pool)
            .await
            .map_err(|e| SearchError::Backend(format!("CLEAR failed: {e}")))?;

        Ok(result.rows_affected() as usize)
    }

    async fn health_check(&self) -> Result<(), SearchError> {
        self.db
            .ping()
            .await
            .map_err(|e| SearchError::Backend(e.to_string()))
    }
}

// --- records ---

pub struct SqliteRecordStore {
    db: SqliteDatabase,
}

impl SqliteRecordStore {
    /// Insert or replace the owner's record of this type.
    pub async fn upsert(&self, record: &StructuredRecord) -> Result<(), RecordError> {
        let fields = serde_json::to_string(&record.fields).map_err(|e| RecordError::Corrupt {
            owner_id: record.owner_id.clone(),
            reason: e.to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO records (record_type, owner_id, fields, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(record_type, owner_id) DO UPDATE SET
                fields = excluded.fields,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.record_type.as_str())
        .bind(&record.owner_id)
        .bind(&fields)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db.pool)
        .await
        .map_err(|e| RecordError::Unavailable(format!("UPSERT failed: {e}")))?;

        debug!(record_type = %record.record_type, owner = %record.owner_id, "Stored record");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn lookup(
        &self,
        record_type: RecordType,
        owner_id: &str,
    ) -> Result<Option<StructuredRecord>, RecordError> {
        let fields: Option<String> = sqlx::query_scalar(
            "SELECT fields FROM records WHERE record_type = ?1 AND owner_id = ?2",
        )
        .bind(record_type.as_str())
        .bind(owner_id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(|e| RecordError::Unavailable(format!("lookup: {e}")))?;

        let Some(raw) = fields else {
            return Ok(None);
        };

        let fields: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| RecordError::Corrupt {
                owner_id: owner_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(StructuredRecord {
            record_type,
            owner_id: owner_id.to_string(),
            fields,
        }))
    }

    async fn health_check(&self) -> Result<(), RecordError> {
        self.db
            .ping()
            .await
            .map_err(|e| RecordError::Unavailable(e.to_string()))
    }
}

// --- turns ---

pub struct SqliteConversationStore {
    db: SqliteDatabase,
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, session: &SessionId, turn: Turn) -> Result<(), MemoryError> {
        sqlx::query(
            "INSERT INTO turns (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session.as_str())
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.timestamp.to_rfc3339())
        .execute(&self.db.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT turn failed: {e}")))?;

        Ok(())
    }

    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, MemoryError> {
        let rows = sqlx::query(
            "SELECT role, content, created_at FROM turns WHERE session_id = ?1 ORDER BY seq ASC",
        )
        .bind(session.as_str())
        .fetch_all(&self.db.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("load turns: {e}")))?;

        rows.iter()
            .map(|row| {
                let get = |e: sqlx::Error| MemoryError::QueryFailed(format!("turn row: {e}"));
                let role: String = row.try_get("role").map_err(get)?;
                let content: String = row.try_get("content").map_err(get)?;
                let created_at: String = row.try_get("created_at").map_err(get)?;
                let role = TurnRole::parse(&role)
                    .ok_or_else(|| MemoryError::QueryFailed(format!("unknown role '{role}'")))?;
                Ok(Turn {
                    role,
                    content,
                    timestamp: parse_timestamp(&created_at),
                })
            })
            .collect()
    }

    async fn health_check(&self) -> Result<(), MemoryError> {
        self.db
            .ping()
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))
    }
}
