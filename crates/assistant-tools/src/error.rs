//! Error Types for the assistant tools

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolsError>;

#[derive(Error, Debug)]
pub enum ToolsError {
    #[error("Invalid characters in expression")]
    InvalidCharacters,

    #[error("{0}")]
    Syntax(String),

    #[error("{0}")]
    ZeroDivision(&'static str),

    #[error("{0}")]
    Overflow(&'static str),

    #[error("Error: Google Search API key is missing. Please add GOOGLE_SEARCH_API to your .env file.")]
    MissingApiKey,

    #[error("Error: Google Custom Search Engine ID is missing. Please add GOOGLE_CSE_ID to your .env file.")]
    MissingEngineId,

    #[error("Search error: {0}")]
    Search(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolsError {
    /// Missing credentials are reported verbatim instead of as a failed search
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::MissingEngineId)
    }
}
