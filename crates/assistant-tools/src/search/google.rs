//! Google Custom Search Client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{SearchClient, SearchHit};
use crate::error::{Result, ToolsError};

/// Custom Search JSON API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

const DEFAULT_NUM_RESULTS: u8 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Google Custom Search configuration
///
/// Credentials are optional here: a missing key is reported per search so
/// the assistant keeps working without web search configured.
#[derive(Clone, Debug)]
pub struct GoogleSearchConfig {
    /// `GOOGLE_SEARCH_API`
    pub api_key: Option<String>,

    /// `GOOGLE_CSE_ID`
    pub engine_id: Option<String>,

    pub endpoint: String,

    /// Results per query
    pub num_results: u8,

    pub timeout_secs: u64,
}

impl Default for GoogleSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            endpoint: DEFAULT_ENDPOINT.into(),
            num_results: DEFAULT_NUM_RESULTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GoogleSearchConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            api_key: non_empty("GOOGLE_SEARCH_API"),
            engine_id: non_empty("GOOGLE_CSE_ID"),
            ..Self::default()
        }
    }

    /// Both credentials are present
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }
}

/// Google Custom Search client
pub struct GoogleSearchClient {
    http_client: Client,
    config: GoogleSearchConfig,
}

impl GoogleSearchClient {
    pub fn new(config: GoogleSearchConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GoogleSearchConfig::from_env())
    }

    pub const fn config(&self) -> &GoogleSearchConfig {
        &self.config
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl From<SearchItem> for SearchHit {
    fn from(item: SearchItem) -> Self {
        Self {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
        }
    }
}

#[async_trait]
impl SearchClient for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ToolsError::MissingApiKey)?;
        let engine_id = self
            .config
            .engine_id
            .as_deref()
            .ok_or(ToolsError::MissingEngineId)?;

        tracing::debug!(%query, "Querying Google Custom Search");

        let num = self.config.num_results.to_string();
        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[
                ("q", query),
                ("key", api_key),
                ("cx", engine_id),
                ("num", num.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        tracing::debug!(results = body.items.len(), "Search completed");

        Ok(body.items.into_iter().map(SearchHit::from).collect())
    }

    fn name(&self) -> &str {
        "Google Custom Search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_lookup() {
        let config = GoogleSearchConfig::from_lookup(|key| match key {
            "GOOGLE_SEARCH_API" => Some("key".into()),
            "GOOGLE_CSE_ID" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.engine_id, None);
        assert!(!config.is_configured());
        assert_eq!(config.num_results, 5);
    }

    #[tokio::test]
    async fn test_missing_api_key_checked_first() {
        let client = GoogleSearchClient::new(GoogleSearchConfig::default()).unwrap();
        let err = client.search("rust").await.unwrap_err();
        assert!(matches!(err, ToolsError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_missing_engine_id() {
        let config = GoogleSearchConfig {
            api_key: Some("key".into()),
            ..GoogleSearchConfig::default()
        };
        let client = GoogleSearchClient::new(config).unwrap();
        let err = client.search("rust").await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("GOOGLE_CSE_ID"));
    }

    #[test]
    fn test_response_items_map_to_hits() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "items": [{ "title": "Rust", "link": "https://www.rust-lang.org", "extra": 1 }]
        }))
        .unwrap();

        let hits: Vec<SearchHit> = body.items.into_iter().map(SearchHit::from).collect();
        assert_eq!(hits[0].title, "Rust");
        assert_eq!(hits[0].snippet, "");

        let empty: SearchResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.items.is_empty());
    }
}
