//! Turns a loop outcome into what the caller sees.

use folio_core::error::Error;
use serde::{Deserialize, Serialize};

use crate::loop_runner::{LoopOutcome, ReasoningTrace};

pub const DEFAULT_ANSWER: &str = "I apologize, but I couldn't generate a response.";

/// One tool invocation as shown to the caller in verbose mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub tool: String,
    pub input: serde_json::Value,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub user_id: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_steps: Option<Vec<ReasoningStep>>,
    pub success: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ResponseAssembler {
    verbose: bool,
    output_limit: usize,
}

impl ResponseAssembler {
    pub fn new(verbose: bool, output_limit: usize) -> Self {
        Self {
            verbose,
            output_limit,
        }
    }

    pub fn assemble(&self, outcome: &LoopOutcome, user_id: &str, query: &str) -> ChatResponse {
        let answer = if outcome.answer.trim().is_empty() {
            DEFAULT_ANSWER.to_string()
        } else {
            outcome.answer.clone()
        };

        ChatResponse {
            answer,
            user_id: user_id.to_string(),
            query: query.to_string(),
            reasoning_steps: (self.verbose && !outcome.trace.is_empty())
                .then(|| self.steps(&outcome.trace)),
            success: true,
        }
    }

    /// Response for a query the loop could not serve at all.
    pub fn degraded(&self, error: &Error, user_id: &str, query: &str) -> ChatResponse {
        ChatResponse {
            answer: format!(
                "I apologize, but I encountered an error while processing your request: {error}"
            ),
            user_id: user_id.to_string(),
            query: query.to_string(),
            reasoning_steps: None,
            success: false,
        }
    }

    fn steps(&self, trace: &ReasoningTrace) -> Vec<ReasoningStep> {
        trace
            .steps()
            .iter()
            .map(|s| ReasoningStep {
                tool: s.tool.clone(),
                input: s.input.clone(),
                output: truncate_output(&s.output, self.output_limit),
            })
            .collect()
    }
}

/// Cut `text` to `limit` characters, marking the cut with `...`.
pub fn truncate_output(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
