//! FAQ search tool: semantic search over the shared company FAQ corpus.
//!
//! The corpus is the same for every user, so this tool takes no identity.
//! When nothing clears the similarity threshold it says so explicitly
//! instead of handing the model weak passages to improvise from.

use async_trait::async_trait;
use folio_core::error::ToolError;
use folio_core::tool::{Tool, ToolResult};
use folio_memory::SimilarityIndex;
use std::sync::Arc;
use tracing::info;

pub const NO_INFORMATION: &str =
    "I don't have sufficient information about this topic in our FAQ knowledge base.";

/// Retrieval limits applied to every FAQ search.
#[derive(Debug, Clone, Copy)]
pub struct FaqSearchSettings {
    pub top_k: usize,
    pub min_similarity: f32,
}

impl Default for FaqSearchSettings {
    fn default() -> Self {
        Self {
            top_k: 15,
            min_similarity: 0.7,
        }
    }
}

pub struct FaqSearchTool {
    index: Arc<SimilarityIndex>,
    settings: FaqSearchSettings,
}

impl FaqSearchTool {
    pub fn new(index: Arc<SimilarityIndex>, settings: FaqSearchSettings) -> Self {
        Self { index, settings }
    }
}

#[async_trait]
impl Tool for FaqSearchTool {
    fn name(&self) -> &str {
        "search_faq_documents"
    }

    fn description(&self) -> &str {
        "Search the company FAQ documents using semantic similarity. Use this for general \
         questions about the company's services, publishing process, timelines, policies, \
         and award programs. The FAQs are shared by all users and contain no personal data."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query text"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        info!(query = %query.chars().take(100).collect::<String>(), "Searching FAQ documents");

        let outcome = self
            .index
            .search(query, self.settings.top_k, self.settings.min_similarity)
            .await;

        let data = serde_json::json!({
            "found_documents": outcome.found_documents,
            "total_matches": outcome.total_matches,
            "search_successful": outcome.search_successful,
        });

        if outcome.search_successful && outcome.found_documents > 0 {
            let output = format!(
                "Found {} relevant FAQ documents:\n\n{}",
                outcome.found_documents, outcome.combined_text
            );
            return Ok(ToolResult::ok(output).with_data(data));
        }

        if let Some(error) = &outcome.error {
            return Ok(ToolResult::failed(format!(
                "I encountered an error while searching for FAQ information: {error}"
            ))
            .with_data(data));
        }

        // An honest "nothing found" is a successful tool call
        let output = match &outcome.message {
            Some(message) => format!("{NO_INFORMATION} {message}"),
            None => NO_INFORMATION.to_string(),
        };
        Ok(ToolResult::ok(output).with_data(data))
    }
}
