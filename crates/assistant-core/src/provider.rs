//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for chat-completion backends so the router
//! and orchestrator work with any provider (Groq, an OpenAI-compatible
//! server, or a scripted test double) without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_core::provider::{GenerationOptions, LlmProvider, ToolChoice};
//!
//! let options = GenerationOptions::new("llama-3.3-70b-versatile")
//!     .with_tools(registry.schemas())
//!     .with_tool_choice(ToolChoice::Auto);
//!
//! let completion = provider.complete(conversation.messages(), &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// How the model may use the attached tools
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to call a tool
    Auto,
    /// Model must call the named tool
    Function(String),
}

/// Configuration for a single completion request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama-3.3-70b-versatile")
    pub model: String,

    /// Sampling temperature; provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate; provider default when unset
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Tools advertised to the model
    #[serde(default)]
    pub tools: Vec<ToolSchema>,

    /// Tool-choice directive (only meaningful when tools are attached)
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,
}

impl GenerationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The assistant message, normalized from the provider's wire format
    pub message: Message,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// A plain text completion
    pub fn text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }

    /// A completion carrying structured tool calls
    pub fn tool_calls(model: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            message: Message::assistant_tool_calls(calls),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }

    /// Text content, empty when the model only issued tool calls
    pub fn content(&self) -> &str {
        self.message.text()
    }

    pub fn tool_calls_requested(&self) -> &[ToolCall] {
        &self.message.tool_calls
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Map an OpenAI-style finish reason string
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// List available model ids
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;
}
