//! Semantic search domain: passages, embeddings, and search outcomes.
//!
//! Passages belong to a corpus partition identified by their
//! `document_type` tag. The FAQ corpus is shared by every user, so searches
//! are scoped by partition only, never by user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Partition tag of the shared FAQ corpus.
pub const COMPANY_FAQ: &str = "company_faq";

/// Metadata carried by every passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Corpus partition this passage belongs to
    pub document_type: String,

    /// Stable identifier (same as the passage id)
    pub doc_id: String,

    /// When the passage was indexed
    pub created_at: DateTime<Utc>,

    /// Ingestion-supplied extras (topic, source file, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An indexed, embedded unit of FAQ text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub metadata: PassageMetadata,
}

/// A passage returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageMatch {
    pub doc_id: String,
    pub text: String,
    /// Cosine similarity to the query, higher is closer
    pub similarity: f32,
    pub metadata: PassageMetadata,
}

/// Result of a thresholded FAQ search.
///
/// When `search_successful` is false the caller must treat the outcome as
/// "no information available": `combined_text` is empty and `documents`
/// holds nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    /// Matches that cleared the similarity floor
    pub found_documents: usize,
    /// Matches returned by the store before thresholding
    pub total_matches: usize,
    /// Surviving passage texts, most similar first, separated by a blank line
    pub combined_text: String,
    pub documents: Vec<PassageMatch>,
    pub search_successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    /// An unsuccessful outcome caused by a backend failure.
    pub fn failed(query: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            query: query.into(),
            search_successful: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// The embedding service: text in, fixed-length vector out.
///
/// Identical text must produce vectors with comparable similarity across
/// calls.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError>;
}

/// Storage and nearest-neighbour retrieval of embedded passages.
///
/// Implementations: SQLite, in-memory.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or replace (by id) a passage.
    async fn upsert(&self, passage: Passage) -> Result<(), SearchError>;

    /// Up to `top_k` passages of `partition` ordered by descending
    /// similarity to `vector`.
    async fn query(
        &self,
        vector: &[f32],
        partition: &str,
        top_k: usize,
    ) -> Result<Vec<PassageMatch>, SearchError>;

    async fn get(&self, id: &str) -> Result<Option<Passage>, SearchError>;

    /// Remove a passage by id. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, SearchError>;

    async fn count(&self, partition: &str) -> Result<usize, SearchError>;

    /// Remove every passage of `partition`, returning how many were removed.
    async fn clear(&self, partition: &str) -> Result<usize, SearchError>;

    async fn health_check(&self) -> Result<(), SearchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_is_unsuccessful_and_empty() {
        let outcome = SearchOutcome::failed("editing", SearchError::Backend("down".into()));
        assert!(!outcome.search_successful);
        assert_eq!(outcome.found_documents, 0);
        assert!(outcome.combined_text.is_empty());
        assert!(outcome.error.unwrap().contains("down"));
    }

    #[test]
    fn passage_embedding_not_serialized() {
        let passage = Passage {
            id: "faq_1".into(),
            text: "Editing takes four to six weeks.".into(),
            embedding: vec![0.1, 0.2],
            metadata: PassageMetadata {
                document_type: COMPANY_FAQ.into(),
                doc_id: "faq_1".into(),
                created_at: Utc::now(),
                extra: serde_json::Map::new(),
            },
        };
        let json = serde_json::to_string(&passage).unwrap();
        assert!(json.contains("company_faq"));
        assert!(!json.contains("embedding"));
    }
}
