//! Structured per-user records (book and award status).
//!
//! Records are written by an external ingestion process and are read-only
//! from the assistant's point of view. There is at most one record per
//! `(record type, owner)` pair.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RecordError;

/// The kinds of structured record the assistant can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Book,
    Award,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Book => "book",
            RecordType::Award => "award",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "book" => Some(RecordType::Book),
            "award" => Some(RecordType::Award),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A small set of named fields owned by one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub record_type: RecordType,
    pub owner_id: String,
    pub fields: BTreeMap<String, String>,
}

impl StructuredRecord {
    pub fn new(record_type: RecordType, owner_id: impl Into<String>) -> Self {
        Self {
            record_type,
            owner_id: owner_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Keyed lookups of structured records.
///
/// `Ok(None)` is the normal "no such record" outcome; `Err` is reserved for
/// backend failures.
///
/// Implementations: SQLite, in-memory.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(
        &self,
        record_type: RecordType,
        owner_id: &str,
    ) -> Result<Option<StructuredRecord>, RecordError>;

    async fn health_check(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_builder_and_get() {
        let rec = StructuredRecord::new(RecordType::Book, "alice")
            .field("title", "The Digital Revolution")
            .field("status", "in_editing");
        assert_eq!(rec.get("status"), Some("in_editing"));
        assert_eq!(rec.get("missing"), None);
    }

    #[test]
    fn record_type_parse() {
        assert_eq!(RecordType::parse("award"), Some(RecordType::Award));
        assert_eq!(RecordType::parse("Book"), None);
        assert_eq!(RecordType::Book.to_string(), "book");
    }
}
