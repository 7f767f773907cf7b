//! In-memory stores: used for tests, ephemeral runs, and as the volatile
//! conversation fallback when the durable store is unreachable.

use async_trait::async_trait;
use folio_core::error::{MemoryError, RecordError, SearchError};
use folio_core::memory::{ConversationStore, SessionId, Turn};
use folio_core::record::{RecordStore, RecordType, StructuredRecord};
use folio_core::search::{Passage, PassageMatch, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vector::rank_passages;

/// Passages keyed by id.
pub struct InMemoryVectorStore {
    passages: Arc<RwLock<HashMap<String, Passage>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            passages: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, passage: Passage) -> Result<(), SearchError> {
        let mut passages = self.passages.write().await;
        let existing = passages
            .values()
            .find(|p| {
                p.id != passage.id
                    && p.metadata.document_type == passage.metadata.document_type
            })
            .map(|p| p.embedding.len());
        if let Some(expected) = existing {
            if expected != passage.embedding.len() {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: passage.embedding.len(),
                });
            }
        }
        passages.insert(passage.id.clone(), passage);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        partition: &str,
        top_k: usize,
    ) -> Result<Vec<PassageMatch>, SearchError> {
        let passages = self.passages.read().await;
        Ok(rank_passages(passages.values(), vector, partition, top_k))
    }

    async fn get(&self, id: &str) -> Result<Option<Passage>, SearchError> {
        Ok(self.passages.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, SearchError> {
        Ok(self.passages.write().await.remove(id).is_some())
    }

    async fn count(&self, partition: &str) -> Result<usize, SearchError> {
        let passages = self.passages.read().await;
        Ok(passages
            .values()
            .filter(|p| p.metadata.document_type == partition)
            .count())
    }

    async fn clear(&self, partition: &str) -> Result<usize, SearchError> {
        let mut passages = self.passages.write().await;
        let before = passages.len();
        passages.retain(|_, p| p.metadata.document_type != partition);
        Ok(before - passages.len())
    }
}

/// One record per `(type, owner)`.
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<(RecordType, String), StructuredRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the owner's record of this type.
    pub async fn upsert(&self, record: StructuredRecord) {
        let key = (record.record_type, record.owner_id.clone());
        self.records.write().await.insert(key, record);
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn lookup(
        &self,
        record_type: RecordType,
        owner_id: &str,
    ) -> Result<Option<StructuredRecord>, RecordError> {
        let records = self.records.read().await;
        Ok(records.get(&(record_type, owner_id.to_string())).cloned())
    }
}

/// Per-session turn logs held in process memory.
pub struct InMemoryConversationStore {
    sessions: Arc<RwLock<HashMap<SessionId, Vec<Turn>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions that have at least one turn.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, session: &SessionId, turn: Turn) -> Result<(), MemoryError> {
        self.sessions
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, MemoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default())
    }
}
