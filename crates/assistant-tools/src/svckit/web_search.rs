//! Web Search Tool
//!
//! Looks a query up through a `SearchClient` and returns the top results
//! as a pretty-printed JSON array of `{title, link, snippet}`.

use std::sync::Arc;

use assistant_core::{
    AgentError, Arguments, Result as CoreResult, Tool, ToolSchema, tool::ParameterSchema,
};
use async_trait::async_trait;
use serde_json::Value;

use crate::search::SearchClient;

/// Reply when the engine returns no items
pub const NO_RESULTS: &str = "No results found";

/// Tool for searching the web
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    /// Run a search; failures become a message for the model
    pub async fn search(&self, query: &str) -> String {
        match self.client.search(query).await {
            Ok(hits) if hits.is_empty() => NO_RESULTS.to_string(),
            Ok(hits) => serde_json::to_string_pretty(&hits)
                .unwrap_or_else(|e| format!("Search failed: {e}")),
            Err(e) if e.is_configuration() => {
                tracing::warn!(error = %e, "Web search is not configured");
                e.to_string()
            }
            Err(e) => {
                tracing::error!(engine = self.client.name(), error = %e, "Search failed");
                format!("Search failed: {e}")
            }
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Search the web for current information on a topic".into(),
            parameters: vec![ParameterSchema::required_string(
                "query",
                "The search query to look up",
            )],
        }
    }

    async fn call(&self, arguments: &Arguments) -> CoreResult<String> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AgentError::ToolValidation("query must be a non-empty string".into()))?;

        Ok(self.search(query).await)
    }
}
