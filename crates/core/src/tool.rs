//! Tool trait: the abstraction over capabilities the reasoning model can call.
//!
//! A tool is described to the model by name, description and a JSON schema
//! of the parameters the model may supply. Some tools also depend on
//! parameters the system binds itself (the caller's identity); those are
//! declared through [`Tool::injected_parameters`], never advertised to the
//! model, and stripped from model-supplied arguments before execution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::ToolError;
use crate::memory::SessionId;
use crate::provider::ToolDefinition;

/// Name of the injected identity parameter.
pub const USER_ID_PARAM: &str = "user_id";

/// System-bound parameters for one session's tools.
///
/// Constructed once from the authenticated caller and handed to tool
/// constructors. Nothing the model or the conversation produces can
/// change it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParams {
    user_id: SessionId,
}

impl BoundParams {
    pub fn new(user_id: SessionId) -> Self {
        Self { user_id }
    }

    /// The identity that scopes structured lookups.
    pub fn user_id(&self) -> &SessionId {
        &self.user_id
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: false,
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search_faq_documents").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing the model-supplied parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Parameters bound by the system at construction time.
    fn injected_parameters(&self) -> &[&'static str] {
        &[]
    }

    /// Execute the tool with the given (already sanitized) arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        let mut parameters = self.parameters_schema();
        for injected in self.injected_parameters() {
            if let Some(props) = parameters
                .get_mut("properties")
                .and_then(|p| p.as_object_mut())
            {
                props.remove(*injected);
            }
            if let Some(required) = parameters
                .get_mut("required")
                .and_then(|r| r.as_array_mut())
            {
                required.retain(|r| r.as_str() != Some(*injected));
            }
        }
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters,
        }
    }
}

/// A registry of available tools.
///
/// The reasoning loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
///
/// The loop never inspects tool names itself, so adding a tool only means
/// registering it here.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call.
    ///
    /// Any model-supplied value for an injected parameter is dropped before
    /// the tool sees the arguments.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let mut arguments = call.arguments.clone();
        if let Some(obj) = arguments.as_object_mut() {
            for injected in tool.injected_parameters() {
                if obj.remove(*injected).is_some() {
                    warn!(
                        tool = %call.name,
                        parameter = injected,
                        "Dropped model-supplied value for injected parameter"
                    );
                }
            }
        }

        let mut result = tool.execute(arguments).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolResult::ok(text))
        }
    }

    /// Echoes its full argument object and declares an injected identity.
    struct WhoAmITool {
        bound: BoundParams,
    }

    #[async_trait]
    impl Tool for WhoAmITool {
        fn name(&self) -> &str {
            "whoami"
        }
        fn description(&self) -> &str {
            "Reports the bound identity"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "user_id": { "type": "string" },
                    "note": { "type": "string" }
                },
                "required": ["user_id"]
            })
        }
        fn injected_parameters(&self) -> &[&'static str] {
            &[USER_ID_PARAM]
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::ok(self.bound.user_id().to_string()).with_data(arguments))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_definitions_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(WhoAmITool {
            bound: BoundParams::new(SessionId::from("alice")),
        }));
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "whoami");
    }

    #[test]
    fn injected_parameters_hidden_from_definition() {
        let tool = WhoAmITool {
            bound: BoundParams::new(SessionId::from("alice")),
        };
        let def = tool.to_definition();
        assert!(def.parameters["properties"].get("user_id").is_none());
        assert!(def.parameters["properties"].get("note").is_some());
        assert_eq!(def.parameters["required"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello world"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello world");
        assert_eq!(result.call_id, "call_1");
    }

    #[tokio::test]
    async fn registry_strips_injected_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(WhoAmITool {
            bound: BoundParams::new(SessionId::from("alice")),
        }));

        let call = ToolCall {
            id: "call_1".into(),
            name: "whoami".into(),
            arguments: serde_json::json!({"user_id": "mallory", "note": "hi"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result.output, "alice");
        let seen = result.data.unwrap();
        assert!(seen.get("user_id").is_none());
        assert_eq!(seen["note"], "hi");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
