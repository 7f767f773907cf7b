//! LLM provider implementations for Folio.
//!
//! All providers implement the `folio_core::Provider` trait. The router
//! builds the chat and embedding backends named by configuration.

pub mod embedder;
pub mod openai_compat;
pub mod router;

pub use embedder::ProviderEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
