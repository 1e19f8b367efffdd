//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for Groq's OpenAI-compatible
//! chat-completions API, including native function calling.

use std::time::{Duration, Instant};

use assistant_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage, ToolChoice,
    },
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Default Groq API root
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Groq provider configuration
#[derive(Clone, Debug)]
pub struct GroqConfig {
    /// Bearer token
    pub api_key: String,

    /// API root, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read `GROQ_API_KEY`, `GROQ_BASE_URL` and `GROQ_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; the API key is mandatory
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Config("GROQ_API_KEY not found in environment variables".into())
            })?;

        let base_url = lookup("GROQ_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map_or_else(
                || DEFAULT_BASE_URL.to_string(),
                |url| url.trim_end_matches('/').to_string(),
            );

        let timeout_secs = lookup("GROQ_TIMEOUT_SECS")
            .and_then(|secs| secs.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            base_url,
            timeout_secs,
        })
    }
}

/// Groq chat-completions provider
pub struct GroqProvider {
    http_client: Client,
    config: GroqConfig,
}

impl GroqProvider {
    /// Create from configuration
    pub fn from_config(config: GroqConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GroqConfig::from_env()?)
    }

    pub const fn config(&self) -> &GroqConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url)
    }

    fn transport_error(&self, e: &reqwest::Error) -> AgentError {
        if e.is_timeout() {
            AgentError::ProviderUnavailable(format!(
                "request timed out after {}s",
                self.config.timeout_secs
            ))
        } else if e.is_connect() {
            AgentError::ProviderUnavailable(format!(
                "cannot connect to {}: {e}",
                self.config.base_url
            ))
        } else {
            AgentError::Provider(format!("request failed: {e}"))
        }
    }

    async fn get_models(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(self.url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("model list: {e}")))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.get_models().await {
            Ok(models) => {
                tracing::info!(models = models.len(), "Groq health check successful");
                Ok(true)
            }
            Err(e @ AgentError::Auth(_)) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Groq health check failed");
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.get_models().await
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatRequest::build(messages, options);
        tracing::debug!(
            model = %options.model,
            messages = messages.len(),
            tools = options.tools.len(),
            request = %serde_json::to_string(&request).unwrap_or_default(),
            "Sending chat completion"
        );

        let start = Instant::now();
        let response = self
            .http_client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Groq API returned error status");
            return Err(status_error(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        tracing::debug!(
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            response = %body,
            "Chat completion received"
        );

        parse_completion(&body, &options.model)
    }
}

/// Decode a raw chat-completions body
fn parse_completion(body: &str, requested_model: &str) -> Result<Completion> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::Parse(format!("chat completion: {e}")))?;
    response.into_completion(requested_model)
}

fn status_error(status: StatusCode, body: String) -> AgentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(body),
        s if s.is_server_error() => AgentError::ProviderUnavailable(format!("HTTP {s}: {body}")),
        s => AgentError::HttpStatus {
            status: s.as_u16(),
            body,
        },
    }
}

// Wire types for the OpenAI-compatible API

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

impl<'a> ChatRequest<'a> {
    fn build(messages: &'a [Message], options: &'a GenerationOptions) -> Self {
        let tools: Vec<Value> = options.tools.iter().map(wire_tool).collect();
        // A tool choice without tools is rejected by the API
        let tool_choice = if tools.is_empty() {
            None
        } else {
            options.tool_choice.as_ref().map(wire_tool_choice)
        };

        Self {
            model: &options.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
            tools,
            tool_choice,
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let is_tool = message.role == Role::Tool;
        Self {
            role: message.role.as_str(),
            content: message.content.as_deref(),
            tool_calls: message.tool_calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: message.tool_call_id.as_deref().filter(|_| is_tool),
            name: message.name.as_deref().filter(|_| is_tool),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".into()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

fn wire_tool(schema: &ToolSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": schema.name,
            "description": schema.description,
            "parameters": schema.parameters_json(),
        }
    })
}

fn wire_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Function(name) => json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl ChatResponse {
    fn into_completion(self, requested_model: &str) -> Result<Completion> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("completion has no choices".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
            .collect();

        let message = if tool_calls.is_empty() {
            Message::assistant(choice.message.content.unwrap_or_default())
        } else {
            let mut message = Message::assistant_tool_calls(tool_calls);
            message.content = choice.message.content.filter(|c| !c.trim().is_empty());
            message
        };

        Ok(Completion {
            message,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            usage: self.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::tool::ParameterSchema;

    fn search_schema() -> ToolSchema {
        ToolSchema {
            name: "web_search".into(),
            description: "Search the web".into(),
            parameters: vec![ParameterSchema::required_string("query", "Search query")],
        }
    }

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_config_requires_api_key() {
        let err = GroqConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        let err = GroqConfig::from_lookup(lookup(&[("GROQ_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = GroqConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk_test")])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let config = GroqConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("GROQ_BASE_URL", "http://localhost:8080/v1/"),
            ("GROQ_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_request_with_forced_function() {
        let messages = [Message::system("sys"), Message::user("What is 2+2?")];
        let options = GenerationOptions::new("llama-3.3-70b-versatile")
            .with_tools(vec![search_schema()])
            .with_tool_choice(ToolChoice::Function("web_search".into()))
            .with_temperature(0.7)
            .with_max_tokens(4096);

        let body = serde_json::to_value(ChatRequest::build(&messages, &options)).unwrap();

        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["max_completion_tokens"], 4096);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "web_search");
        assert_eq!(
            body["tools"][0]["function"]["parameters"]["required"][0],
            "query"
        );
        assert_eq!(body["tool_choice"]["function"]["name"], "web_search");
    }

    #[test]
    fn test_request_without_tools_omits_choice() {
        let messages = [Message::user("hi")];
        let options = GenerationOptions::new("m").with_tool_choice(ToolChoice::Auto);

        let body = serde_json::to_value(ChatRequest::build(&messages, &options)).unwrap();

        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_request_serializes_tool_turns() {
        let call = ToolCall::new("call_9", "calculate", r#"{"expression":"1+1"}"#);
        let messages = [
            Message::assistant_tool_calls(vec![call.clone()]),
            Message::tool_result(&call, r#"{"result": 2}"#),
        ];
        let options = GenerationOptions::new("m");

        let body = serde_json::to_value(ChatRequest::build(&messages, &options)).unwrap();

        let assistant = &body["messages"][0];
        assert!(assistant["content"].is_null());
        assert_eq!(assistant["tool_calls"][0]["id"], "call_9");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        assert_eq!(
            assistant["tool_calls"][0]["function"]["arguments"],
            r#"{"expression":"1+1"}"#
        );
        assert!(assistant.get("tool_call_id").is_none());

        let tool = &body["messages"][1];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_9");
        assert_eq!(tool["name"], "calculate");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let raw = json!({
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": { "name": "calculate", "arguments": "{\"expression\":\"17 * (3+2)\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        });

        let response: ChatResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("fallback").unwrap();

        assert_eq!(completion.model, "llama-3.3-70b-versatile");
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(completion.message.content, None);
        let call = &completion.tool_calls_requested()[0];
        assert_eq!(call.id, "call_abc");
        assert_eq!(call.parse_arguments().unwrap()["expression"], "17 * (3+2)");
        assert_eq!(completion.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_response_with_text() {
        let raw = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "Hello!", "tool_calls": null },
                "finish_reason": "stop"
            }]
        });

        let response: ChatResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("requested").unwrap();

        assert_eq!(completion.content(), "Hello!");
        assert_eq!(completion.model, "requested");
        assert!(completion.tool_calls_requested().is_empty());
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let response: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            response.into_completion("m"),
            Err(AgentError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_completion_from_raw_body() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}]}"#;

        let completion = parse_completion(body, "requested").unwrap();
        assert_eq!(completion.content(), "Hi");
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));

        assert!(matches!(
            parse_completion("<html>busy</html>", "m"),
            Err(AgentError::Parse(_))
        ));
    }

    #[test]
    fn test_request_log_payload_carries_tools_and_choice() {
        let messages = [Message::user("latest news")];
        let options = GenerationOptions::new("m")
            .with_tools(vec![search_schema()])
            .with_tool_choice(ToolChoice::Auto);

        let payload = serde_json::to_string(&ChatRequest::build(&messages, &options)).unwrap();

        assert!(payload.contains(r#""content":"latest news""#));
        assert!(payload.contains(r#""name":"web_search""#));
        assert!(payload.contains(r#""tool_choice":"auto""#));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            AgentError::Auth(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            AgentError::RateLimited(_)
        ));
        let unavailable = status_error(StatusCode::BAD_GATEWAY, String::new());
        assert!(unavailable.is_retryable());
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad tool".into()),
            AgentError::HttpStatus { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn test_health_check_unreachable_is_false() {
        let mut config = GroqConfig::new("gsk_test");
        config.base_url = "http://127.0.0.1:9".into();
        config.timeout_secs = 2;
        let provider = GroqProvider::from_config(config).unwrap();

        assert!(!provider.health_check().await.unwrap());
    }
}
