//! # Folio Core
//!
//! Domain types, traits, and error definitions for the Folio author assistant.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every backing source the reasoning loop can reach is a trait here:
//! the language model ([`Provider`]), the embedding service ([`Embedder`]),
//! passage storage ([`VectorStore`]), per-user records ([`RecordStore`]) and
//! conversation history ([`ConversationStore`]). Implementations live in
//! their respective crates, so tests can swap any of them for a stub.

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod record;
pub mod search;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::{ConversationStore, SessionId, Turn, TurnRole};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use record::{RecordStore, RecordType, StructuredRecord};
pub use search::{Embedder, Passage, PassageMatch, PassageMetadata, SearchOutcome, VectorStore};
pub use tool::{BoundParams, Tool, ToolCall, ToolRegistry, ToolResult};
