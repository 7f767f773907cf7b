//! Storage for Folio: the FAQ similarity index, vector stores, structured
//! record stores, and conversation stores.

pub mod file_backend;
pub mod in_memory;
pub mod index;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileConversationStore;
pub use in_memory::{InMemoryConversationStore, InMemoryRecordStore, InMemoryVectorStore};
pub use index::SimilarityIndex;
pub use vector::{cosine_similarity, rank_passages};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConversationStore, SqliteDatabase, SqliteRecordStore, SqliteVectorStore};
