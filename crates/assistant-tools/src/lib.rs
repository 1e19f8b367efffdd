//! # assistant-tools
//!
//! The two tools the assistant can route to:
//!
//! - **`calculate`** - arithmetic over a whitelisted character set, with
//!   integer results kept integral
//! - **`web_search`** - top results from a [`search::SearchClient`]
//!   (Google Custom Search in production)
//!
//! Both report failures as text in their output so the model can explain
//! them; only malformed arguments are returned as errors.

pub mod error;
pub mod expression;
pub mod search;
pub mod svckit;

use std::sync::Arc;

use assistant_core::ToolRegistry;

pub use error::{Result, ToolsError};
pub use search::{GoogleSearchClient, GoogleSearchConfig, MockSearchClient, SearchClient, SearchHit};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{CalculatorTool, WebSearchTool};
}

/// Registry with `web_search` and `calculate`, in that order
pub fn default_registry(search: Arc<dyn SearchClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tools::WebSearchTool::new(search));
    registry.register(tools::CalculatorTool::new());
    registry
}
