//! # assistant-core
//!
//! Tool routing, text tool-call recovery and turn orchestration for a
//! chat assistant backed by any chat-completion provider.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Agent                               │
//! │  ┌──────────┐  ┌──────────────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │  Router  │──│ TextToolDetector │──│  Tools   │──│   Llm    │  │
//! │  │ (hints)  │  │  (regex tiers)   │  │ Registry │  │ Provider │  │
//! │  └──────────┘  └──────────────────┘  └──────────┘  └──────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the orchestrator independent of the
//! backend; `assistant-runtime` supplies the Groq implementation.

pub mod detector;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod router;
pub mod tool;

#[cfg(test)]
mod testing;

pub use detector::{DetectedToolCall, TextToolDetector};
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{Agent, AgentConfig, TurnOutcome, TurnPath};
pub use provider::{Completion, GenerationOptions, LlmProvider, ToolChoice};
pub use router::{Router, RoutingDecision, ToolCategory};
pub use tool::{Arguments, ParameterSchema, Tool, ToolCall, ToolRegistry, ToolSchema};
