//! Mock Search Client
//!
//! For testing and offline demos. Returns canned results and records the
//! queries it was asked.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{SearchClient, SearchHit};
use crate::error::{Result, ToolsError};

/// Mock search client with static results
#[derive(Default)]
pub struct MockSearchClient {
    hits: Vec<SearchHit>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every query with `hits`
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// Fail every query with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }

        match &self.failure {
            Some(message) => Err(ToolsError::Search(message.clone())),
            None => Ok(self.hits.clone()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
