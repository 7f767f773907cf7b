//! The Folio assistant: a bounded reasoning loop over FAQ search and the
//! caller's own book and award records.
//!
//! For each query the assistant:
//!
//! 1. **Starts session memory** (durable store, or the volatile fallback)
//! 2. **Builds the tool registry** for the caller (full, or FAQ-only)
//! 3. **Runs the loop**: reason, call tools, observe, until an answer
//! 4. **Records the exchange** and assembles the response
//!
//! The loop stops when the model answers without calling a tool, or when
//! the step ceiling is reached.

pub mod assistant;
pub mod loop_runner;
pub mod prompt;
pub mod response;
pub mod seed;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use assistant::{
    Assistant, AssistantSettings, ChatRequest, ComponentHealth, HealthReport, HealthStatus,
    Runtime,
};
pub use loop_runner::{AgentLoop, LoopOutcome, LoopState, ReasoningTrace, Termination, TraceStep};
pub use response::{ChatResponse, DEFAULT_ANSWER, ReasoningStep, ResponseAssembler};
pub use session::SessionMemory;
