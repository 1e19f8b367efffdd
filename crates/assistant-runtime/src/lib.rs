//! # assistant-runtime
//!
//! Runtime providers for the tool-routing assistant.
//!
//! ## Providers
//!
//! - **Groq** (default): OpenAI-compatible chat completions with native
//!   function calling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_runtime::groq::GroqProvider;
//!
//! let provider = GroqProvider::from_env()?;
//! let agent = Agent::with_defaults(Arc::new(provider), Arc::new(tools));
//! ```

pub mod groq;

pub use groq::{GroqConfig, GroqProvider};

// Re-export core types for convenience
pub use assistant_core::{
    Agent, AgentConfig, AgentError, Conversation, LlmProvider, Message, Result, Role, Tool,
    ToolRegistry,
};
