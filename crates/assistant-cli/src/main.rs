//! Groq Assistant CLI
//!
//! Interactive chat with web search and calculation tools. Tool progress is
//! printed as `[System]` lines; diagnostics go to stderr via `RUST_LOG`
//! and a debug trace of each session is written under `logs/`.

mod config;
mod logging;
mod repl;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use assistant_core::{Agent, LlmProvider};
use assistant_runtime::GroqProvider;
use assistant_tools::{GoogleSearchClient, default_registry};

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    let session_log = logging::init()?;
    tracing::info!("Session log: {}", session_log.display());

    let config = AppConfig::from_env()?;

    // Initialize LLM provider
    let provider = Arc::new(GroqProvider::from_config(config.groq.clone())?);

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Groq at {}", provider.config().base_url);
            // List available models
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::debug!("  Model: {}", model);
                }
            }
        }
        Ok(false) => {
            tracing::warn!("⚠ Groq API not reachable - requests will fail until it is");
        }
        Err(e) => return Err(e).context("Groq rejected the configured API key"),
    }

    // Initialize tools
    if !config.search.is_configured() {
        tracing::warn!("⚠ Web search not configured");
        tracing::warn!("  Set GOOGLE_SEARCH_API and GOOGLE_CSE_ID in .env");
    }
    let search = GoogleSearchClient::new(config.search.clone())?;
    let tools = default_registry(Arc::new(search));

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent = Agent::new(provider, Arc::new(tools), config.agent);

    repl::run(
        &agent,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
