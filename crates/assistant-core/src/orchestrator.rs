//! Conversation Orchestrator
//!
//! Runs one user turn through the routing / tool-reconciliation state
//! machine:
//!
//! ```text
//! ROUTE ─► FIRST_CALL ─┬─► STRUCTURED_TOOLS ───┐
//!                      ├─► TEXT_DETECTED_TOOL ─┼─► SECOND_CALL ─► DONE
//!                      ├─► FORCE_TOOL ─────────┘
//!                      └─► DIRECT_ANSWER ───────────────────────► DONE
//! ```
//!
//! Every path leaves the history ending on an assistant message, and every
//! tool message answers a call of the assistant message right before it.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::detector::{TextToolDetector, WEB_SEARCH};
use crate::error::AgentError;
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider, ToolChoice};
use crate::router::{DEFAULT_ROUTING_MODEL, Router, RoutingDecision, ToolCategory};
use crate::tool::{ToolCall, ToolRegistry};

/// Model used when the router expects a tool
pub const DEFAULT_TOOL_MODEL: &str = "llama-3.3-70b-versatile";

/// Model used when the router expects no tool
pub const DEFAULT_GENERAL_MODEL: &str = "llama-3.3-70b-versatile";

/// Reply when the first completion call fails
pub const FIRST_CALL_APOLOGY: &str =
    "I encountered an error processing your request. Please try again.";

/// Reply when the follow-up completion call fails
pub const FOLLOW_UP_APOLOGY: &str =
    "I encountered an error processing the results. Please try again.";

const FORCED_SEARCH_CALL_ID: &str = "forced_web_search_call";

const DEFAULT_SYSTEM_PROMPT: &str = r"You are a helpful AI assistant with web search and calculation capabilities.

IMPORTANT: When you need current information or facts, call the web_search function through the function calling mechanism. Do NOT write the call out as text.
Never write things like '<function=web_search>' or 'I'll use web_search' in your reply; invoke the tool instead.

Use the calculate function, through function calling, for arithmetic.

Remember:
- Current information: web_search
- Calculations: calculate
- Questions you can answer from your own knowledge: answer directly";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt inserted when the history has none
    pub system_prompt: String,

    /// First-call model when a tool was suggested
    pub tool_model: String,

    /// First-call model when no tool was suggested
    pub general_model: String,

    /// Model for the call that turns tool results into an answer
    pub follow_up_model: String,

    /// Model for the routing pre-step
    pub routing_model: String,

    /// First-call sampling temperature
    pub temperature: f32,

    /// First-call output budget
    pub max_tokens: u32,

    /// Collect user-facing progress lines
    pub show_feedback: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            tool_model: DEFAULT_TOOL_MODEL.into(),
            general_model: DEFAULT_GENERAL_MODEL.into(),
            follow_up_model: DEFAULT_TOOL_MODEL.into(),
            routing_model: DEFAULT_ROUTING_MODEL.into(),
            temperature: 0.7,
            max_tokens: 4096,
            show_feedback: true,
        }
    }
}

/// Which branch of the state machine produced the reply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPath {
    /// The model issued structured tool calls
    StructuredTools,
    /// A tool call was recovered from the model's text
    TextDetected,
    /// A suggested web search was forced with the user's text
    ForcedSearch,
    /// The model's first answer was returned as is
    Direct,
    /// A completion call failed and the apology was returned
    Failed,
}

/// Result of one user turn
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// Text shown to the user
    pub reply: String,

    /// Progress lines, empty when feedback is disabled
    pub feedback: Vec<String>,

    pub path: TurnPath,
}

/// Per-turn feedback collector
struct TurnLog {
    show_feedback: bool,
    feedback: Vec<String>,
}

impl TurnLog {
    const fn new(show_feedback: bool) -> Self {
        Self {
            show_feedback,
            feedback: Vec::new(),
        }
    }

    fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{line}");
        if self.show_feedback {
            self.feedback.push(line);
        }
    }

    fn finish(self, conversation: &mut Conversation, reply: String, path: TurnPath) -> TurnOutcome {
        conversation.push(Message::assistant(reply.clone()));
        tracing::debug!(
            ?path,
            history = %serde_json::to_string(conversation.messages()).unwrap_or_default(),
            "Conversation state"
        );
        TurnOutcome {
            reply,
            feedback: self.feedback,
            path,
        }
    }

    fn fail(
        mut self,
        conversation: &mut Conversation,
        context: &str,
        error: &AgentError,
        apology: &str,
    ) -> TurnOutcome {
        tracing::error!(error = %error, retryable = error.is_retryable(), "{context}");
        self.note(format!("{context}: {}", error.user_message()));
        self.finish(conversation, apology.to_string(), TurnPath::Failed)
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    router: Router,
    detector: TextToolDetector,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        let router = Router::new(provider.clone(), config.routing_model.clone());
        let detector = TextToolDetector::new(&tools);

        Self {
            provider,
            tools,
            router,
            detector,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Ask a single question in a fresh conversation
    pub async fn ask(&self, question: &str) -> TurnOutcome {
        let mut conversation = Conversation::with_system_prompt(self.config.system_prompt.clone());
        self.run_turn(&mut conversation, question).await
    }

    /// Run one user turn against `conversation`, mutating it in place.
    /// Never fails: remote errors become an apology reply.
    pub async fn run_turn(&self, conversation: &mut Conversation, user_input: &str) -> TurnOutcome {
        let mut log = TurnLog::new(self.config.show_feedback);
        conversation.ensure_system_prompt(&self.config.system_prompt);

        let decision = self.router.route(user_input).await;
        log.note(format!("Routing decision: {decision}"));

        conversation.push(Message::user(user_input));
        let options = self.first_call_options(&decision, &mut log);
        tracing::debug!(model = %options.model, "Selected model");

        let completion = match self.provider.complete(conversation.messages(), &options).await {
            Ok(completion) => completion,
            Err(e) => {
                return log.fail(conversation, "Error in API call", &e, FIRST_CALL_APOLOGY);
            }
        };

        let message = completion.message;

        if message.has_tool_calls() {
            let calls = message.tool_calls.clone();
            conversation.push(message);

            for call in &calls {
                self.announce(call, "", &mut log);
                let output = self.execute(call, &mut log).await;
                conversation.push(Message::tool_result(call, output));
            }

            return self.follow_up(conversation, log, TurnPath::StructuredTools).await;
        }

        let content = message.content.unwrap_or_default();

        if let Some(detected) = self.detector.detect(&content) {
            tracing::debug!(span = %detected.matched_span, "Converting text tool call");
            let call = detected.to_tool_call(format!("manual_{}_call", detected.tool_name));
            self.announce(&call, " via text pattern", &mut log);
            log.note("Converting text pattern to proper tool call");

            self.run_synthetic_call(conversation, call, &mut log).await;
            return self.follow_up(conversation, log, TurnPath::TextDetected).await;
        }

        if let Some(primary) = decision.primary() {
            log.note("Detected suggested tools weren't used. Forcing tool usage...");

            match primary {
                ToolCategory::WebSearch => {
                    let parameter = self
                        .tools
                        .primary_parameter(WEB_SEARCH)
                        .unwrap_or_else(|| "query".to_string());
                    let mut arguments = serde_json::Map::new();
                    arguments.insert(parameter, Value::String(user_input.to_string()));
                    let call = ToolCall::with_arguments(
                        FORCED_SEARCH_CALL_ID,
                        WEB_SEARCH,
                        &Value::Object(arguments),
                    );
                    log.note(format!("Forcing WebSearch, query is \"{user_input}\""));

                    self.run_synthetic_call(conversation, call, &mut log).await;
                    return self.follow_up(conversation, log, TurnPath::ForcedSearch).await;
                }
                // No expression can be invented for the calculator
                ToolCategory::Calculate => {
                    log.note("Could not force calculator usage without a valid expression");
                }
            }

            log.note("No tools were used despite routing suggestion");
        }

        log.finish(conversation, content, TurnPath::Direct)
    }

    /// Tool set, tool choice and model for the first call
    fn first_call_options(&self, decision: &RoutingDecision, log: &mut TurnLog) -> GenerationOptions {
        let tool_choice = match decision.single() {
            Some(category) => {
                log.note(format!("Directing model to use {}", category.tool_name()));
                ToolChoice::Function(category.tool_name().to_string())
            }
            None => ToolChoice::Auto,
        };

        let model = if decision.is_empty() {
            &self.config.general_model
        } else {
            &self.config.tool_model
        };

        GenerationOptions::new(model.clone())
            .with_tools(self.tools.schemas())
            .with_tool_choice(tool_choice)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    /// Record a locally built call and its result in the history
    async fn run_synthetic_call(&self, conversation: &mut Conversation, call: ToolCall, log: &mut TurnLog) {
        let output = self.execute(&call, log).await;
        conversation.push(Message::assistant_tool_calls(vec![call.clone()]));
        conversation.push(Message::tool_result(&call, output));
    }

    /// Run one call; every failure becomes an error payload for the model
    async fn execute(&self, call: &ToolCall, log: &mut TurnLog) -> String {
        if !self.tools.contains(&call.name) {
            log.note(format!("Unknown tool called: {}", call.name));
            return error_payload(format!("Unknown function: {}", call.name));
        }

        let arguments = match call.parse_arguments() {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "Undecodable tool arguments");
                log.note(format!("Invalid arguments for {}: {e}", call.name));
                return error_payload(format!("Invalid arguments for {}: {e}", call.name));
            }
        };

        match self.tools.invoke(&call.name, &arguments).await {
            Ok(output) => {
                tracing::info!(tool = %call.name, arguments = %call.arguments, %output, "Tool used");
                output
            }
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "Tool call failed");
                error_payload(format!("{} failed: {e}", tool_label(&call.name)))
            }
        }
    }

    /// Feedback line describing a tool about to run
    fn announce(&self, call: &ToolCall, via: &str, log: &mut TurnLog) {
        let Some(parameter) = self.tools.primary_parameter(&call.name) else {
            return;
        };
        let value = call
            .parse_arguments()
            .ok()
            .and_then(|args| args.get(&parameter).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        log.note(format!(
            "Assistant is using {}{via}, {parameter} is \"{value}\"",
            tool_label(&call.name)
        ));
    }

    /// SECOND_CALL: plain completion over the updated history
    async fn follow_up(&self, conversation: &mut Conversation, log: TurnLog, path: TurnPath) -> TurnOutcome {
        tracing::debug!(?path, "Making follow-up call with tool results");
        let options = GenerationOptions::new(self.config.follow_up_model.clone());

        match self.provider.complete(conversation.messages(), &options).await {
            Ok(completion) => {
                let reply = completion.message.content.unwrap_or_default();
                log.finish(conversation, reply, path)
            }
            Err(e) => log.fail(conversation, "Error in second API call", &e, FOLLOW_UP_APOLOGY),
        }
    }
}

fn error_payload(message: String) -> String {
    json!({ "error": message }).to_string()
}

fn tool_label(name: &str) -> &str {
    match name {
        "web_search" => "WebSearch",
        "calculate" => "Calculator",
        other => other,
    }
}
