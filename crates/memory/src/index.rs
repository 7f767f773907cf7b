//! Similarity search index over the shared FAQ corpus.
//!
//! Wraps an [`Embedder`] and a [`VectorStore`] and applies the honesty
//! threshold: passages below `min_similarity` are never returned, and a
//! search with no surviving passage reports itself as unsuccessful rather
//! than handing back weak matches.

use chrono::Utc;
use folio_core::error::SearchError;
use folio_core::event::{DomainEvent, EventBus};
use folio_core::search::{
    COMPANY_FAQ, Embedder, Passage, PassageMetadata, SearchOutcome, VectorStore,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct SimilarityIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    partition: String,
    events: Option<EventBus>,
}

impl SimilarityIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            partition: COMPANY_FAQ.to_string(),
            events: None,
        }
    }

    /// Publish a `SearchPerformed` event for every search.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Use a partition tag other than `company_faq`.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Embed `text` and store it in the shared partition.
    ///
    /// Generates an id when none is given; re-indexing an existing id
    /// replaces the passage. `extra` may add metadata keys but cannot
    /// override the partition tag, id, or creation time.
    pub async fn index(
        &self,
        text: &str,
        id: Option<String>,
        extra: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String, SearchError> {
        if text.trim().is_empty() {
            return Err(SearchError::Embedding("cannot index empty text".into()));
        }

        let id = id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let embedding = self.embedder.embed(text).await?;

        let passage = Passage {
            id: id.clone(),
            text: text.to_string(),
            embedding,
            metadata: PassageMetadata {
                document_type: self.partition.clone(),
                doc_id: id.clone(),
                created_at: Utc::now(),
                extra: extra.unwrap_or_default(),
            },
        };

        self.store.upsert(passage).await.inspect_err(|e| {
            error!(doc_id = %id, error = %e, "Failed to store FAQ passage");
        })?;

        info!(doc_id = %id, partition = %self.partition, "Indexed FAQ passage");
        Ok(id)
    }

    /// Thresholded semantic search. Never fails: backend errors come back
    /// as an unsuccessful outcome with `error` set.
    pub async fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> SearchOutcome {
        let outcome = match self.try_search(query, top_k, min_similarity).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "FAQ search failed");
                SearchOutcome::failed(query, e)
            }
        };

        if let Some(events) = &self.events {
            events.publish(DomainEvent::SearchPerformed {
                query: outcome.query.clone(),
                found: outcome.found_documents,
                total: outcome.total_matches,
                successful: outcome.search_successful,
                timestamp: Utc::now(),
            });
        }
        outcome
    }

    async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<SearchOutcome, SearchError> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.store.query(&vector, &self.partition, top_k).await?;
        let total_matches = matches.len();

        let documents: Vec<_> = matches
            .into_iter()
            .filter(|m| m.similarity >= min_similarity)
            .collect();
        let found = documents.len();

        let combined_text = documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let message = if found == 0 {
            Some(format!(
                "No FAQ documents found with similarity >= {min_similarity}"
            ))
        } else if found < total_matches {
            Some(format!(
                "Found {found} highly relevant FAQ documents out of {total_matches} total matches"
            ))
        } else {
            None
        };

        debug!(found, total = total_matches, min_similarity, "FAQ search completed");

        Ok(SearchOutcome {
            query: query.to_string(),
            found_documents: found,
            total_matches,
            combined_text,
            documents,
            search_successful: found > 0,
            message,
            error: None,
        })
    }

    /// Remove a passage from the shared partition.
    ///
    /// Ids that are absent or belong to another partition are left alone and
    /// report `false`; so do backend failures.
    pub async fn delete(&self, id: &str) -> bool {
        let existing = match self.store.get(id).await {
            Ok(p) => p,
            Err(e) => {
                error!(doc_id = %id, error = %e, "Failed to look up FAQ passage");
                return false;
            }
        };

        match existing {
            Some(p) if p.metadata.document_type == self.partition => {}
            Some(_) => {
                warn!(doc_id = %id, "Refusing to delete passage outside the FAQ partition");
                return false;
            }
            None => {
                warn!(doc_id = %id, "FAQ passage not found");
                return false;
            }
        }

        match self.store.delete(id).await {
            Ok(removed) => {
                if removed {
                    info!(doc_id = %id, "Deleted FAQ passage");
                }
                removed
            }
            Err(e) => {
                error!(doc_id = %id, error = %e, "Failed to delete FAQ passage");
                false
            }
        }
    }

    /// Drop every passage of the shared partition.
    ///
    /// Needed before re-indexing with an embedding model of another
    /// dimension; other partitions are untouched.
    pub async fn clear(&self) -> Result<usize, SearchError> {
        let removed = self.store.clear(&self.partition).await.inspect_err(|e| {
            error!(partition = %self.partition, error = %e, "Failed to clear FAQ partition");
        })?;
        info!(partition = %self.partition, removed, "Cleared FAQ partition");
        Ok(removed)
    }

    /// Number of passages in the shared partition, 0 on backend failure.
    pub async fn count(&self) -> usize {
        self.store.count(&self.partition).await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to count FAQ passages");
            0
        })
    }

    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Vector store health check failed");
                false
            }
        }
    }
}
