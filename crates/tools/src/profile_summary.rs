//! Profile summary: a one-glance view of the caller's book and award.

use async_trait::async_trait;
use folio_core::error::{RecordError, ToolError};
use folio_core::record::{RecordStore, RecordType, StructuredRecord};
use folio_core::tool::{BoundParams, Tool, ToolResult, USER_ID_PARAM};
use std::sync::Arc;
use tracing::{error, info};

pub struct ProfileSummaryTool {
    records: Arc<dyn RecordStore>,
    bound: BoundParams,
}

impl ProfileSummaryTool {
    pub fn new(records: Arc<dyn RecordStore>, bound: BoundParams) -> Self {
        Self { records, bound }
    }

    async fn fetch(
        &self,
        record_type: RecordType,
    ) -> Result<Option<StructuredRecord>, RecordError> {
        self.records
            .lookup(record_type, self.bound.user_id().as_str())
            .await
    }
}

fn summarize(book: Option<&StructuredRecord>, award: Option<&StructuredRecord>) -> String {
    let mut out = String::from("Your Profile Summary:\n");

    match book {
        Some(b) => out.push_str(&format!(
            "Book: {} (status: {})\n",
            b.get("title").unwrap_or("Untitled"),
            b.get("status").unwrap_or("unknown"),
        )),
        None => out.push_str("Book: none on file\n"),
    }

    match award {
        Some(a) => out.push_str(&format!(
            "Award: {} (stage: {})\n",
            a.get("award_name").unwrap_or("Unnamed award"),
            a.get("award_stage").unwrap_or("unknown"),
        )),
        None => out.push_str("Award: none on file\n"),
    }

    out
}

#[async_trait]
impl Tool for ProfileSummaryTool {
    fn name(&self) -> &str {
        "get_user_profile_summary"
    }

    fn description(&self) -> &str {
        "Get a short summary of the current user's profile: their book and its status, and \
         their award submission and its stage. Use this when the user asks for an overview \
         of everything on file for them. Takes no arguments."
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
        info!(owner = %owner, "Building profile summary");

        let book = self.fetch(RecordType::Book).await;
        let award = self.fetch(RecordType::Award).await;

        match (book, award) {
            (Ok(book), Ok(award)) => {
                let data = serde_json::json!({
                    "has_book": book.is_some(),
                    "has_award": award.is_some(),
                });
                Ok(ToolResult::ok(summarize(book.as_ref(), award.as_ref())).with_data(data))
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(owner = %owner, error = %e, "Profile lookup failed");
                Ok(ToolResult::failed(format!(
                    "I encountered an error while building your profile summary: {e}"
                )))
            }
        }
    }
}
