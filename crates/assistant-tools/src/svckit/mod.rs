//! Service Kit - Assistant Tools
//!
//! Tools that implement `assistant_core::Tool` for the assistant.

mod calculator;
mod web_search;

pub use calculator::CalculatorTool;
pub use web_search::WebSearchTool;
