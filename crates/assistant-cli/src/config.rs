//! Application Configuration

use anyhow::Context;
use assistant_core::AgentConfig;
use assistant_runtime::GroqConfig;
use assistant_tools::GoogleSearchConfig;

/// Everything the CLI reads from the environment
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub groq: GroqConfig,
    pub search: GoogleSearchConfig,
    pub agent: AgentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let groq = GroqConfig::from_lookup(&lookup).context("invalid Groq configuration")?;
        let search = GoogleSearchConfig::from_lookup(&lookup);

        let mut agent = AgentConfig::default();
        if let Some(model) = non_empty(&lookup, "ASSISTANT_TOOL_MODEL") {
            agent.follow_up_model.clone_from(&model);
            agent.tool_model = model;
        }
        if let Some(model) = non_empty(&lookup, "ASSISTANT_GENERAL_MODEL") {
            agent.general_model = model;
        }
        if let Some(model) = non_empty(&lookup, "ASSISTANT_ROUTING_MODEL") {
            agent.routing_model = model;
        }
        if let Some(flag) = non_empty(&lookup, "ASSISTANT_SHOW_FEEDBACK") {
            agent.show_feedback = parse_flag(&flag);
        }

        Ok(Self {
            groq,
            search,
            agent,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        AppConfig::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
    }

    #[test]
    fn test_api_key_is_required() {
        let err = from_pairs(&[]).unwrap_err();
        assert!(format!("{err:#}").contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[("GROQ_API_KEY", "gsk_test")]).unwrap();
        assert!(config.agent.show_feedback);
        assert_eq!(config.agent.routing_model, "llama-3.1-8b-instant");
        assert_eq!(config.agent.tool_model, "llama-3.3-70b-versatile");
        assert!(!config.search.is_configured());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("ASSISTANT_TOOL_MODEL", "big"),
            ("ASSISTANT_GENERAL_MODEL", "general"),
            ("ASSISTANT_ROUTING_MODEL", "small"),
            ("ASSISTANT_SHOW_FEEDBACK", "Off"),
            ("GOOGLE_SEARCH_API", "key"),
            ("GOOGLE_CSE_ID", "cx"),
        ])
        .unwrap();

        assert_eq!(config.agent.tool_model, "big");
        assert_eq!(config.agent.follow_up_model, "big");
        assert_eq!(config.agent.general_model, "general");
        assert_eq!(config.agent.routing_model, "small");
        assert!(!config.agent.show_feedback);
        assert!(config.search.is_configured());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("FALSE"));
    }
}
