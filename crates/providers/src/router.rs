//! Provider router: builds the configured providers and hands out the chat
//! and embedding backends.
//!
//! Chat and embeddings may come from different providers (e.g. OpenAI for
//! reasoning, Gemini for embeddings); each distinct provider is built once.

use folio_config::AppConfig;
use folio_core::error::ProviderError;
use folio_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embedder::ProviderEmbedder;
use crate::openai_compat::{
    GEMINI_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatProvider,
};

pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    chat_provider: String,
    embedding_provider: String,
}

impl ProviderRouter {
    pub fn new(chat_provider: impl Into<String>, embedding_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            chat_provider: chat_provider.into(),
            embedding_provider: embedding_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The provider that runs the reasoning loop.
    pub fn chat(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get(&self.chat_provider).ok_or_else(|| {
            ProviderError::NotConfigured(format!("provider '{}'", self.chat_provider))
        })
    }

    /// An embedder over the embedding provider using `model`.
    pub fn embedder(&self, model: &str) -> Result<ProviderEmbedder, ProviderError> {
        let provider = self.get(&self.embedding_provider).ok_or_else(|| {
            ProviderError::NotConfigured(format!("provider '{}'", self.embedding_provider))
        })?;
        Ok(ProviderEmbedder::new(provider, model))
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Build the chat and embedding providers named by the configuration.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let chat = config.default_provider.clone();
    let embedding = config.embedding_provider().to_string();
    let mut router = ProviderRouter::new(&chat, &embedding);

    for name in [&chat, &embedding] {
        if router.get(name).is_some() {
            continue;
        }
        let provider = build_provider(config, name)?;
        debug!(provider = %name, base_url = %provider.base_url(), "Provider configured");
        router.register(name.clone(), Arc::new(provider));
    }

    Ok(router)
}

fn build_provider(config: &AppConfig, name: &str) -> Result<OpenAiCompatProvider, ProviderError> {
    let base_url = match config.api_url_for(name) {
        Some(url) => url.to_string(),
        None => default_base_url(name)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "provider '{name}' has no known endpoint; set providers.{name}.api_url"
                ))
            })?
            .to_string(),
    };

    let api_key = match config.api_key_for(name) {
        Some(key) => key,
        None if name == "ollama" => "ollama".to_string(),
        None => {
            warn!(provider = %name, "No API key configured; requests will be rejected");
            String::new()
        }
    };

    OpenAiCompatProvider::new(name, base_url, api_key)
}

fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some(OPENAI_BASE_URL),
        "openrouter" => Some(OPENROUTER_BASE_URL),
        "gemini" => Some(GEMINI_BASE_URL),
        "ollama" => Some(OLLAMA_BASE_URL),
        _ => None,
    }
}
