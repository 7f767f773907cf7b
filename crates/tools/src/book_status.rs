//! Book status lookup for the caller's own book record.

use async_trait::async_trait;
use folio_core::error::ToolError;
use folio_core::record::{RecordStore, RecordType, StructuredRecord};
use folio_core::tool::{BoundParams, Tool, ToolResult, USER_ID_PARAM};
use std::sync::Arc;
use tracing::{error, info};

pub const NO_BOOK: &str = "No book information found for your account. You may not have any books in our system yet.";

pub struct BookStatusTool {
    records: Arc<dyn RecordStore>,
    bound: BoundParams,
}

impl BookStatusTool {
    pub fn new(records: Arc<dyn RecordStore>, bound: BoundParams) -> Self {
        Self { records, bound }
    }
}

/// Render a book record the way it is shown to the model.
pub fn format_book(record: &StructuredRecord) -> String {
    format!(
        "Book Status Information:\n\
         Title: {}\n\
         Current Status: {}\n\
         Stage Notes: {}\n\
         Book ID: {}\n",
        record.get("title").unwrap_or("N/A"),
        record.get("status").unwrap_or("Unknown"),
        record.get("stage_notes").unwrap_or("No notes available"),
        record.get("book_id").unwrap_or("N/A"),
    )
}

#[async_trait]
impl Tool for BookStatusTool {
    fn name(&self) -> &str {
        "book_status_lookup"
    }

    fn description(&self) -> &str {
        "Look up the current user's book: title, current status, editorial stage notes, and \
         book ID. Use this for any question about the user's own book or manuscript progress. \
         Takes no arguments; the user is identified automatically."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn injected_parameters(&self) -> &[&'static str] {
        &[USER_ID_PARAM]
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let owner = self.bound.user_id().as_str();
        info!(owner = %owner, "Looking up book status");

        match self.records.lookup(RecordType::Book, owner).await {
            Ok(Some(record)) => Ok(ToolResult::ok(format_book(&record))
                .with_data(serde_json::json!(record.fields))),
            Ok(None) => Ok(ToolResult::ok(NO_BOOK)),
            Err(e) => {
                error!(owner = %owner, error = %e, "Book lookup failed");
                Ok(ToolResult::failed(format!(
                    "I encountered an error while looking up book status: {e}"
                )))
            }
        }
    }
}
