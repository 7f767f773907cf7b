//! The bounded reasoning loop.
//!
//! A query moves through `AwaitingInput -> Reasoning -> (ToolCall ->
//! Reasoning)* -> FinalAnswer`. Each reasoning step sends the system prompt,
//! prior turns, the query, and the scratchpad of tool calls and tool
//! results gathered so far. The model decides which tools to call from
//! their descriptions alone; the loop never routes on tool names.
//!
//! The number of tool-call steps is capped. When the cap is reached the
//! model gets one last tool-less request to answer from what it has, and
//! if that fails too an answer is synthesised from the trace.

use folio_core::error::{Error, ToolError};
use folio_core::event::{DomainEvent, EventBus};
use folio_core::memory::Turn;
use folio_core::message::{Message, MessageToolCall};
use folio_core::provider::{Provider, ProviderRequest};
use folio_core::tool::{ToolCall, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const GENERATE_INSTRUCTION: &str = "You have reached the limit on tool use for this question. \
Using only the information gathered above, give the best final answer you can now. If that \
information is not enough, say so honestly.";

/// Where the loop is for the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    Reasoning,
    ToolCall,
    FinalAnswer,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingInput => "awaiting_input",
            Self::Reasoning => "reasoning",
            Self::ToolCall => "tool_call",
            Self::FinalAnswer => "final_answer",
        };
        f.write_str(s)
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model produced an answer on its own.
    Completed,
    /// The step ceiling was hit.
    Exhausted,
}

/// One tool invocation and what it returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub tool: String,
    pub input: serde_json::Value,
    pub output: String,
    pub success: bool,
}

/// Ordered tool invocations for a single query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningTrace {
    steps: Vec<TraceStep>,
}

impl ReasoningTrace {
    pub fn push(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fallback answer built from successful observations.
    pub fn synthesize_answer(&self) -> String {
        let findings: Vec<&str> = self
            .steps
            .iter()
            .filter(|s| s.success && !s.output.trim().is_empty())
            .map(|s| s.output.trim())
            .collect();

        if findings.is_empty() {
            return "I wasn't able to find an answer to your question within the allowed number \
                    of steps. Please try rephrasing it or asking something more specific."
                .to_string();
        }

        format!(
            "I couldn't finish reasoning about your question, but here is what I found:\n\n{}",
            findings.join("\n\n")
        )
    }
}

/// Result of running the loop on one query.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub answer: String,
    pub trace: ReasoningTrace,
    /// Tool-call steps taken.
    pub iterations: usize,
    pub termination: Termination,
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
    max_iterations: usize,
    max_argument_retries: usize,
    events: Option<EventBus>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
            system_prompt: system_prompt.into(),
            max_iterations: 5,
            max_argument_retries: 1,
            events: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Maximum tool-call steps per query.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// How many malformed tool calls are answered with a corrective
    /// observation before they start counting as failed steps.
    pub fn with_argument_retries(mut self, retries: usize) -> Self {
        self.max_argument_retries = retries;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    fn transition(&self, from: LoopState, to: LoopState, step: usize) {
        debug!(from = %from, to = %to, step, "Loop state transition");
    }

    fn request(&self, messages: &[Message], with_tools: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: if with_tools {
                self.tools.definitions()
            } else {
                Vec::new()
            },
        }
    }

    /// Answer `query` given the prior turns of the session.
    ///
    /// Tool failures and malformed tool calls are fed back to the model as
    /// observations. Only a provider failure during reasoning is returned
    /// as an error.
    pub async fn run(&self, history: &[Turn], query: &str) -> Result<LoopOutcome, Error> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(history.iter().map(Message::from));
        messages.push(Message::user(query));

        let mut trace = ReasoningTrace::default();
        let mut iterations = 0;
        let mut argument_retries = 0;

        info!(
            history = history.len(),
            tools = self.tools.len(),
            max_iterations = self.max_iterations,
            "Starting reasoning loop"
        );
        self.transition(LoopState::AwaitingInput, LoopState::Reasoning, 0);

        while iterations < self.max_iterations {
            let response = self
                .provider
                .complete(self.request(&messages, true))
                .await?;

            if response.message.tool_calls.is_empty() {
                self.transition(LoopState::Reasoning, LoopState::FinalAnswer, iterations);
                return Ok(LoopOutcome {
                    answer: response.message.content.trim().to_string(),
                    trace,
                    iterations,
                    termination: Termination::Completed,
                });
            }

            iterations += 1;
            self.transition(LoopState::Reasoning, LoopState::ToolCall, iterations);

            let calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for call in &calls {
                let observation = self
                    .observe(call, &mut trace, &mut argument_retries)
                    .await;
                messages.push(Message::tool_result(&call.id, observation));
            }

            self.transition(LoopState::ToolCall, LoopState::Reasoning, iterations);
        }

        warn!(
            iterations,
            steps = trace.len(),
            "Step ceiling reached, asking for a final answer"
        );
        let answer = self.generate_final(messages, &trace).await;
        self.transition(LoopState::Reasoning, LoopState::FinalAnswer, iterations);

        Ok(LoopOutcome {
            answer,
            trace,
            iterations,
            termination: Termination::Exhausted,
        })
    }

    /// Execute one tool call and return the observation for the model.
    async fn observe(
        &self,
        call: &MessageToolCall,
        trace: &mut ReasoningTrace,
        argument_retries: &mut usize,
    ) -> String {
        let arguments = match parse_arguments(&call.arguments) {
            Ok(args) => args,
            Err(reason) => {
                let input = serde_json::Value::String(call.arguments.clone());
                return self.reject_arguments(call, input, reason, trace, argument_retries);
            }
        };

        let start = std::time::Instant::now();
        let result = self
            .tools
            .execute(&ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: arguments.clone(),
            })
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, output) = match result {
            Ok(result) => (result.success, result.output),
            Err(ToolError::InvalidArguments(reason)) => {
                return self.reject_arguments(call, arguments, reason, trace, argument_retries);
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                (false, format!("Error: {e}"))
            }
        };

        debug!(tool = %call.name, success, duration_ms, "Tool returned");
        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success,
                duration_ms,
                timestamp: chrono::Utc::now(),
            });
        }

        trace.push(TraceStep {
            tool: call.name.clone(),
            input: arguments,
            output: output.clone(),
            success,
        });
        output
    }

    /// Malformed arguments get a corrective observation while the budget
    /// lasts; after that they are recorded as failed steps.
    fn reject_arguments(
        &self,
        call: &MessageToolCall,
        input: serde_json::Value,
        reason: String,
        trace: &mut ReasoningTrace,
        argument_retries: &mut usize,
    ) -> String {
        if *argument_retries < self.max_argument_retries {
            *argument_retries += 1;
            warn!(
                tool = %call.name,
                reason = %reason,
                attempt = *argument_retries,
                "Malformed tool arguments, asking the model to retry"
            );
            return format!(
                "Invalid arguments for tool '{}': {reason}. Call the tool again with a JSON \
                 object that matches its parameter schema.",
                call.name
            );
        }

        warn!(tool = %call.name, reason = %reason, "Malformed tool arguments, retries exhausted");
        let output = format!("Error: invalid arguments for tool '{}': {reason}", call.name);
        trace.push(TraceStep {
            tool: call.name.clone(),
            input,
            output: output.clone(),
            success: false,
        });
        output
    }

    /// One tool-less request for an answer; falls back to the trace.
    async fn generate_final(&self, mut messages: Vec<Message>, trace: &ReasoningTrace) -> String {
        messages.push(Message::system(GENERATE_INSTRUCTION));

        match self.provider.complete(self.request(&messages, false)).await {
            Ok(response)
                if response.message.tool_calls.is_empty()
                    && !response.message.content.trim().is_empty() =>
            {
                response.message.content.trim().to_string()
            }
            Ok(_) => {
                warn!("Final generate call returned no usable answer, synthesising from trace");
                trace.synthesize_answer()
            }
            Err(e) => {
                warn!(error = %e, "Final generate call failed, synthesising from trace");
                trace.synthesize_answer()
            }
        }
    }
}

/// Tool arguments must be a JSON object. An empty string counts as `{}`.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(_) => Err("arguments must be a JSON object".into()),
        Err(e) => Err(format!("arguments are not valid JSON ({e})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        SequentialMockProvider, make_text_response, make_tool_call, make_tool_call_response,
    };
    use async_trait::async_trait;
    use folio_core::error::ProviderError;
    use folio_core::message::Role;
    use folio_core::provider::ProviderResponse;
    use folio_core::tool::{Tool, ToolResult};

    struct AlwaysFails;

    #[async_trait]
    impl Tool for AlwaysFails {
        fn name(&self) -> &str {
            "flaky_lookup"
        }
        fn description(&self) -> &str {
            "Never works"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _: serde_json::Value) -> Result<ToolResult, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "flaky_lookup".into(),
                reason: "backend down".into(),
            })
        }
    }

    struct Lookup;

    #[async_trait]
    impl Tool for Lookup {
        fn name(&self) -> &str {
            "lookup"
        }
        fn description(&self) -> &str {
            "Looks things up"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            })
        }
        async fn execute(&self, args: serde_json::Value) -> Result<ToolResult, ToolError> {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
            Ok(ToolResult::ok(format!("Editing takes 4-6 weeks ({query})")))
        }
    }

    /// Requests a tool call on every turn, including the final one.
    struct Relentless;

    #[async_trait]
    impl Provider for Relentless {
        fn name(&self) -> &str {
            "relentless"
        }
        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(make_tool_call_response(
                vec![make_tool_call("flaky_lookup", serde_json::json!({}))],
                "Let me try again",
            ))
        }
    }

    struct Down;

    #[async_trait]
    impl Provider for Down {
        fn name(&self) -> &str {
            "down"
        }
        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Network("connection reset".into()))
        }
    }

    fn registry(tools: Vec<Box<dyn Tool>>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        Arc::new(registry)
    }

    fn raw_call(name: &str, raw: &str) -> MessageToolCall {
        MessageToolCall {
            id: format!("call_raw_{name}"),
            name: name.into(),
            arguments: raw.into(),
        }
    }

    #[tokio::test]
    async fn direct_answer_completes_without_tools() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello there."));
        let agent = AgentLoop::new(provider.clone(), registry(vec![]), "mock-model", "sys");

        let outcome = agent.run(&[], "hi").await.unwrap();
        assert_eq!(outcome.answer, "Hello there.");
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.trace.is_empty());
    }

    #[tokio::test]
    async fn prompt_contains_system_history_and_query() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let agent = AgentLoop::new(provider.clone(), registry(vec![]), "mock-model", "be nice");
        let history = vec![Turn::user("earlier q"), Turn::assistant("earlier a")];

        agent.run(&history, "now").await.unwrap();

        let requests = provider.requests();
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "be nice");
        assert_eq!(messages[1].content, "earlier q");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].content, "now");
    }

    #[tokio::test]
    async fn tool_result_is_observed_then_answered() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("lookup", serde_json::json!({"query": "editing"}))],
            "Checking the FAQ",
            "Editing takes 4-6 weeks.",
        ));
        let agent = AgentLoop::new(provider.clone(), registry(vec![Box::new(Lookup)]), "m", "s");

        let outcome = agent.run(&[], "How long is editing?").await.unwrap();
        assert_eq!(outcome.answer, "Editing takes 4-6 weeks.");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.trace.len(), 1);
        assert!(outcome.trace.steps()[0].success);
        assert_eq!(outcome.trace.steps()[0].input["query"], "editing");

        // second request carries the assistant tool call and its result
        let second = &provider.requests()[1].messages;
        let last = second.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_lookup"));
        assert!(last.content.contains("4-6 weeks"));
    }

    #[tokio::test]
    async fn always_failing_tool_terminates_with_answer() {
        let agent = AgentLoop::new(
            Arc::new(Relentless),
            registry(vec![Box::new(AlwaysFails)]),
            "m",
            "s",
        )
        .with_max_iterations(3);

        let outcome = agent.run(&[], "What's my status?").await.unwrap();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.trace.len(), 3);
        assert!(outcome.trace.steps().iter().all(|s| !s.success));
        assert!(outcome.trace.steps()[0].output.contains("backend down"));
        assert!(!outcome.answer.trim().is_empty());
    }

    #[tokio::test]
    async fn exhaustion_uses_tool_less_generate_call() {
        let call = || make_tool_call("lookup", serde_json::json!({"query": "x"}));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![call()], ""),
            make_tool_call_response(vec![call()], ""),
            make_text_response("Best effort: editing takes 4-6 weeks."),
        ]));
        let agent = AgentLoop::new(provider.clone(), registry(vec![Box::new(Lookup)]), "m", "s")
            .with_max_iterations(2);

        let outcome = agent.run(&[], "q").await.unwrap();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.answer, "Best effort: editing takes 4-6 weeks.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[1].tools.is_empty());
        assert!(requests[2].tools.is_empty());
    }

    #[tokio::test]
    async fn exhaustion_synthesises_from_trace_when_generate_fails() {
        let call = || make_tool_call("lookup", serde_json::json!({"query": "x"}));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![call()], ""),
            make_text_response("   "),
        ]));
        let agent = AgentLoop::new(provider, registry(vec![Box::new(Lookup)]), "m", "s")
            .with_max_iterations(1);

        let outcome = agent.run(&[], "q").await.unwrap();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert!(outcome.answer.contains("here is what I found"));
        assert!(outcome.answer.contains("4-6 weeks"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_corrected_once() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![raw_call("lookup", "{query: editing")], ""),
            make_tool_call_response(
                vec![make_tool_call("lookup", serde_json::json!({"query": "editing"}))],
                "",
            ),
            make_text_response("Editing takes 4-6 weeks."),
        ]));
        let agent = AgentLoop::new(provider.clone(), registry(vec![Box::new(Lookup)]), "m", "s");

        let outcome = agent.run(&[], "How long is editing?").await.unwrap();
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.answer, "Editing takes 4-6 weeks.");
        assert_eq!(outcome.trace.len(), 1);
        assert_eq!(outcome.trace.steps()[0].tool, "lookup");
        assert!(outcome.trace.steps()[0].success);

        let correction = provider.requests()[1].messages.last().unwrap().content.clone();
        assert!(correction.contains("Invalid arguments for tool 'lookup'"));
    }

    #[tokio::test]
    async fn missing_required_argument_uses_correction_budget() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call("lookup", serde_json::json!({}))], ""),
            make_tool_call_response(vec![make_tool_call("lookup", serde_json::json!({}))], ""),
            make_text_response("I don't know."),
        ]));
        let agent = AgentLoop::new(provider, registry(vec![Box::new(Lookup)]), "m", "s");

        let outcome = agent.run(&[], "q").await.unwrap();
        // first attempt corrected silently, second recorded as a failure
        assert_eq!(outcome.trace.len(), 1);
        assert!(!outcome.trace.steps()[0].success);
        assert!(outcome.trace.steps()[0].output.contains("Missing 'query'"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("no_such_tool", serde_json::json!({}))],
            "",
            "Sorry.",
        ));
        let agent = AgentLoop::new(provider, registry(vec![]), "m", "s");

        let outcome = agent.run(&[], "q").await.unwrap();
        assert_eq!(outcome.answer, "Sorry.");
        assert!(!outcome.trace.steps()[0].success);
        assert!(outcome.trace.steps()[0].output.contains("no_such_tool"));
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let agent = AgentLoop::new(Arc::new(Down), registry(vec![]), "m", "s");
        let err = agent.run(&[], "q").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn tool_executions_are_published() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("lookup", serde_json::json!({"query": "x"}))],
            "",
            "done",
        ));
        let agent = AgentLoop::new(provider, registry(vec![Box::new(Lookup)]), "m", "s")
            .with_events(bus);

        agent.run(&[], "q").await.unwrap();
        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "lookup");
                assert!(*success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn argument_parsing() {
        assert!(parse_arguments("").unwrap().as_object().unwrap().is_empty());
        assert!(parse_arguments(r#"{"query": "x"}"#).is_ok());
        assert!(parse_arguments("[1, 2]").is_err());
        assert!(parse_arguments("{query").is_err());
    }

    #[test]
    fn synthesis_without_findings_is_still_an_answer() {
        let mut trace = ReasoningTrace::default();
        trace.push(TraceStep {
            tool: "t".into(),
            input: serde_json::json!({}),
            output: "Error: down".into(),
            success: false,
        });
        let answer = trace.synthesize_answer();
        assert!(answer.contains("wasn't able to find an answer"));
        assert!(!answer.contains("Error: down"));
    }
}
