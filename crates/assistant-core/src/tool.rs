//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered once at startup and invoked by the orchestrator,
//! either because the model issued a structured call or because the
//! detector recovered one from plain text.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Decoded tool arguments
pub type Arguments = Map<String, Value>;

/// Tool call request, either issued by the model or synthesized locally
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, unique within the turn
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as JSON-encoded text, exactly as sent over the wire
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Build a call from already decoded arguments
    pub fn with_arguments(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self::new(id, name, arguments.to_string())
    }

    /// Decode the argument text into a JSON object
    pub fn parse_arguments(&self) -> Result<Arguments> {
        if self.arguments.trim().is_empty() {
            return Ok(Arguments::new());
        }

        match serde_json::from_str::<Value>(&self.arguments)? {
            Value::Object(map) => Ok(map),
            other => Err(AgentError::ToolValidation(format!(
                "arguments for '{}' must be a JSON object, got {other}",
                self.name
            ))),
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    /// A required string parameter
    pub fn required_string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render the parameters as a JSON Schema object
    pub fn parameters_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.param_type, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The parameter a bare argument value belongs to: the first required
    /// parameter, else the first parameter.
    pub fn primary_parameter(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.required)
            .or_else(|| self.parameters.first())
            .map(|p| p.name.as_str())
    }
}

/// Tool trait - implement to add new capabilities
///
/// A tool returns text that is fed back to the model verbatim. Tools report
/// domain failures inside that text (e.g. `{"error": ...}`); an `Err` means
/// the tool could not run at all.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with decoded arguments
    async fn call(&self, arguments: &Arguments) -> Result<String>;

    /// Validate arguments before execution
    fn validate(&self, arguments: &Arguments) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Registry for available tools, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its schema name, replacing any previous entry
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "Replaced registered tool");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Validate and run a tool
    pub async fn invoke(&self, name: &str, arguments: &Arguments) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        tool.validate(arguments)?;
        tool.call(arguments).await
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Schemas for the named tools; unknown names are skipped
    pub fn schemas_for<S: AsRef<str>>(&self, names: &[S]) -> Vec<ToolSchema> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name.as_ref()))
            .map(|t| t.schema())
            .collect()
    }

    /// Primary parameter of a registered tool
    pub fn primary_parameter(&self, name: &str) -> Option<String> {
        let schema = self.tools.get(name)?.schema();
        schema.primary_parameter().map(str::to_string)
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
