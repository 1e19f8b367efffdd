//! Query Router
//!
//! A cheap pre-step that asks a small model which tools a query is likely
//! to need. The answer is a hint for the orchestrator's tool-choice policy,
//! never a hard gate, and any failure degrades to "no tool".

use std::sync::Arc;

use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};

/// Default model used for routing decisions
pub const DEFAULT_ROUTING_MODEL: &str = "llama-3.1-8b-instant";

const ROUTER_SYSTEM_PROMPT: &str =
    "You are a routing assistant that decides which tools are needed to answer user queries.";

/// Tool categories the router can suggest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    WebSearch,
    Calculate,
}

impl ToolCategory {
    /// All categories, in suggestion priority order
    pub const ALL: [Self; 2] = [Self::WebSearch, Self::Calculate];

    /// Name of the registered tool backing this category
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::WebSearch => "web_search",
            Self::Calculate => "calculate",
        }
    }

    /// Label the routing model answers with
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::WebSearch => "WEB_SEARCH",
            Self::Calculate => "CALCULATE",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Tools suggested for one user turn, ordered web_search before calculate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingDecision {
    categories: Vec<ToolCategory>,
}

impl RoutingDecision {
    /// Decision suggesting no tool
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a decision from categories; duplicates are dropped and the
    /// canonical order is restored.
    pub fn from_categories(categories: impl IntoIterator<Item = ToolCategory>) -> Self {
        let wanted: Vec<ToolCategory> = categories.into_iter().collect();
        Self {
            categories: ToolCategory::ALL
                .into_iter()
                .filter(|c| wanted.contains(c))
                .collect(),
        }
    }

    /// Parse the routing model's answer by case-insensitive keyword search
    pub fn parse(answer: &str) -> Self {
        let answer = answer.trim().to_uppercase();
        Self::from_categories(
            ToolCategory::ALL
                .into_iter()
                .filter(|c| answer.contains(c.keyword())),
        )
    }

    pub fn categories(&self) -> &[ToolCategory] {
        &self.categories
    }

    /// First suggestion, the one a forced fallback acts on
    pub fn primary(&self) -> Option<ToolCategory> {
        self.categories.first().copied()
    }

    /// The suggestion when exactly one tool was suggested
    pub fn single(&self) -> Option<ToolCategory> {
        match self.categories.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn contains(&self, category: ToolCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl std::fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.categories.is_empty() {
            return f.write_str("no_tool");
        }
        let names: Vec<&str> = self.categories.iter().map(|c| c.tool_name()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Router backed by a small, fast model
pub struct Router {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl Router {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            options: GenerationOptions::new(model)
                .with_temperature(0.1)
                .with_max_tokens(20),
        }
    }

    /// Model used for routing
    pub fn model(&self) -> &str {
        &self.options.model
    }

    /// Predict which tools `query` needs. Never fails.
    pub async fn route(&self, query: &str) -> RoutingDecision {
        tracing::debug!(%query, "Routing query");

        let messages = [
            Message::system(ROUTER_SYSTEM_PROMPT),
            Message::user(routing_prompt(query)),
        ];

        match self.provider.complete(&messages, &self.options).await {
            Ok(completion) => {
                tracing::debug!(answer = %completion.content(), "Raw routing decision");
                let decision = RoutingDecision::parse(completion.content());
                tracing::info!(%decision, "Routing decision");
                decision
            }
            Err(e) => {
                tracing::error!(error = %e, "Routing call failed, assuming no tool");
                RoutingDecision::none()
            }
        }
    }
}

fn routing_prompt(query: &str) -> String {
    format!(
        r#"Given the following user query, determine if any tools are needed to answer it.

Available tools:
1. CALCULATE: For mathematical calculations and arithmetic
2. WEB_SEARCH: For current information, facts, news, or data that requires searching the web

Respond with exactly one of:
- "TOOL: CALCULATE" if a calculation tool is needed
- "TOOL: WEB_SEARCH" if a web search tool is needed for current information
- "TOOL: WEB_SEARCH, CALCULATE" if both tools might be needed
- "NO TOOL" if no tools are needed and you can answer from your knowledge

User query: "{query}"

Response (ONLY one of the allowed formats above):"#
    )
}
