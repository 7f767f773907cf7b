//! Award status lookup for the caller's own award nomination.

use async_trait::async_trait;
use folio_core::error::ToolError;
use folio_core::record::{RecordStore, RecordType, StructuredRecord};
use folio_core::tool::{BoundParams, Tool, ToolResult, USER_ID_PARAM};
use std::sync::Arc;
use tracing::{error, info};

pub const NO_AWARD: &str = "No award information found for your account. You may not have any award submissions in our system yet.";

pub struct AwardStatusTool {
    records: Arc<dyn RecordStore>,
    bound: BoundParams,
}

impl AwardStatusTool {
    pub fn new(records: Arc<dyn RecordStore>, bound: BoundParams) -> Self {
        Self { records, bound }
    }
}

pub fn format_award(record: &StructuredRecord) -> String {
    format!(
        "Award Status Information:\n\
         Award: {}\n\
         Stage: {}\n\
         Eligibility: {}\n",
        record.get("award_name").unwrap_or("N/A"),
        record.get("award_stage").unwrap_or("Unknown"),
        record.get("eligibility").unwrap_or("Not assessed"),
    )
}

#[async_trait]
impl Tool for AwardStatusTool {
    fn name(&self) -> &str {
        "award_status_lookup"
    }

    fn description(&self) -> &str {
        "Look up the current user's award submission: award name, current stage, and \
         eligibility assessment. Use this for questions about the user's own nominations \
         or award results. Takes no arguments; the user is identified automatically."
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
        info!(owner = %owner, "Looking up award status");

        match self.records.lookup(RecordType::Award, owner).await {
            Ok(Some(record)) => Ok(ToolResult::ok(format_award(&record))
                .with_data(serde_json::json!(record.fields))),
            Ok(None) => Ok(ToolResult::ok(NO_AWARD)),
            Err(e) => {
                error!(owner = %owner, error = %e, "Award lookup failed");
                Ok(ToolResult::failed(format!(
                    "I encountered an error while looking up award status: {e}"
                )))
            }
        }
    }
}
