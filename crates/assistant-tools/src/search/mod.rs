//! Web Search Backends
//!
//! Abstractions and implementations for the search engine behind the
//! `web_search` tool.

mod google;
mod mock;

pub use google::{GoogleSearchClient, GoogleSearchConfig};
pub use mock::MockSearchClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One search result as handed to the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Search client trait (Strategy pattern)
///
/// Implement this for each search engine.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Top results for `query`; an empty list means nothing was found
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Search engine name
    fn name(&self) -> &str;
}
